//! # KYC Claims
//!
//! A closed set of claim types, each with its own validated payload. The
//! oracle proves a predicate over a claim; the public inputs name the claim
//! type and the subject, while the personal data stays in private inputs.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tag identifying a claim variant. Used as the key of a registration's
/// identity-proof map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// Government identity document.
    Identity,
    /// Control of an email address.
    Email,
    /// Country of residence.
    Residency,
    /// Minimum age.
    Age,
}

impl ClaimType {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Email => "email",
            Self::Residency => "residency",
            Self::Age => "age",
        }
    }
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification tier requested at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycLevel {
    /// Identity only.
    Basic,
    /// Identity and email.
    Standard,
    /// Identity, email and residency.
    Enhanced,
}

impl KycLevel {
    /// Claims that must be present and proven for this level.
    pub fn required_claims(&self) -> &'static [ClaimType] {
        match self {
            Self::Basic => &[ClaimType::Identity],
            Self::Standard => &[ClaimType::Identity, ClaimType::Email],
            Self::Enhanced => &[ClaimType::Identity, ClaimType::Email, ClaimType::Residency],
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Enhanced => "enhanced",
        }
    }
}

impl std::str::FromStr for KycLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "enhanced" => Ok(Self::Enhanced),
            other => Err(format!("unknown KYC level \"{other}\"")),
        }
    }
}

impl std::fmt::Display for KycLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Claim payloads
// ---------------------------------------------------------------------------

/// Government identity document details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    full_name: String,
    document_number: String,
    issuing_country: String,
}

impl IdentityClaim {
    /// Validate and build an identity claim.
    pub fn new(
        full_name: impl Into<String>,
        document_number: impl Into<String>,
        issuing_country: impl Into<String>,
    ) -> Result<Self, String> {
        let claim = Self {
            full_name: full_name.into(),
            document_number: document_number.into(),
            issuing_country: issuing_country.into(),
        };
        claim.validate()?;
        Ok(claim)
    }

    fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("full name is empty".to_string());
        }
        let n = self.document_number.len();
        if !(4..=32).contains(&n) || !self.document_number.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err("document number must be 4-32 alphanumeric characters".to_string());
        }
        validate_country(&self.issuing_country)
    }
}

/// An email address the subject controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailClaim {
    address: String,
}

impl EmailClaim {
    /// Validate and build an email claim.
    pub fn new(address: impl Into<String>) -> Result<Self, String> {
        let claim = Self {
            address: address.into(),
        };
        claim.validate()?;
        Ok(claim)
    }

    fn validate(&self) -> Result<(), String> {
        let (local, domain) = self
            .address
            .split_once('@')
            .ok_or_else(|| "email has no @".to_string())?;
        if local.is_empty()
            || domain.len() < 3
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || self.address.chars().any(char::is_whitespace)
        {
            return Err("email address is malformed".to_string());
        }
        Ok(())
    }
}

/// Country of residence, ISO 3166-1 alpha-2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidencyClaim {
    country: String,
}

impl ResidencyClaim {
    /// Validate and build a residency claim.
    pub fn new(country: impl Into<String>) -> Result<Self, String> {
        let claim = Self {
            country: country.into(),
        };
        validate_country(&claim.country)?;
        Ok(claim)
    }
}

/// Birth date with the minimum age the subject must have reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeClaim {
    birth_date: NaiveDate,
    minimum_age: u8,
}

impl AgeClaim {
    /// Build an age claim. The threshold is checked when the proof is
    /// generated, not here.
    pub fn new(birth_date: NaiveDate, minimum_age: u8) -> Self {
        Self {
            birth_date,
            minimum_age,
        }
    }

    fn age_on(&self, today: NaiveDate) -> i32 {
        let mut age = today.year() - self.birth_date.year();
        if (today.month(), today.day()) < (self.birth_date.month(), self.birth_date.day()) {
            age -= 1;
        }
        age
    }
}

fn validate_country(code: &str) -> Result<(), String> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(format!("country code \"{code}\" is not ISO 3166-1 alpha-2"))
    }
}

// ---------------------------------------------------------------------------
// KycClaim
// ---------------------------------------------------------------------------

/// A KYC claim, tagged by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KycClaim {
    /// See [`IdentityClaim`].
    Identity(IdentityClaim),
    /// See [`EmailClaim`].
    Email(EmailClaim),
    /// See [`ResidencyClaim`].
    Residency(ResidencyClaim),
    /// See [`AgeClaim`].
    Age(AgeClaim),
}

impl KycClaim {
    /// The claim's tag.
    pub fn claim_type(&self) -> ClaimType {
        match self {
            Self::Identity(_) => ClaimType::Identity,
            Self::Email(_) => ClaimType::Email,
            Self::Residency(_) => ClaimType::Residency,
            Self::Age(_) => ClaimType::Age,
        }
    }

    /// Evaluate the claim's predicate. Claims that arrived through
    /// deserialization are re-validated here.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Self::Identity(c) => c.validate(),
            Self::Email(c) => c.validate(),
            Self::Residency(c) => validate_country(&c.country),
            Self::Age(c) => {
                let age = c.age_on(Utc::now().date_naive());
                if age >= i32::from(c.minimum_age) {
                    Ok(())
                } else {
                    Err(format!("subject is below the minimum age of {}", c.minimum_age))
                }
            }
        }
    }

    /// Claim-specific public inputs. Personal data is never included; only
    /// the age threshold is public.
    pub fn public_inputs(&self) -> Value {
        match self {
            Self::Age(c) => json!({ "minimum_age": c.minimum_age }),
            _ => json!({}),
        }
    }

    /// Claim-specific private inputs.
    pub fn private_inputs(&self) -> Value {
        match self {
            Self::Identity(c) => json!({
                "full_name": c.full_name,
                "document_number": c.document_number,
                "issuing_country": c.issuing_country,
            }),
            Self::Email(c) => json!({ "address": c.address }),
            Self::Residency(c) => json!({ "country": c.country }),
            Self::Age(c) => json!({ "birth_date": c.birth_date.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_requirements_are_nested() {
        assert_eq!(KycLevel::Basic.required_claims(), &[ClaimType::Identity]);
        for claim in KycLevel::Basic.required_claims() {
            assert!(KycLevel::Standard.required_claims().contains(claim));
        }
        for claim in KycLevel::Standard.required_claims() {
            assert!(KycLevel::Enhanced.required_claims().contains(claim));
        }
        assert!(KycLevel::Basic < KycLevel::Enhanced);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("Standard".parse::<KycLevel>().unwrap(), KycLevel::Standard);
        assert!("platinum".parse::<KycLevel>().is_err());
    }

    #[test]
    fn identity_validation() {
        assert!(IdentityClaim::new("Ada Lovelace", "P1234567", "GB").is_ok());
        assert!(IdentityClaim::new("", "P1234567", "GB").is_err());
        assert!(IdentityClaim::new("Ada", "P1", "GB").is_err());
        assert!(IdentityClaim::new("Ada", "P1234567", "gb").is_err());
    }

    #[test]
    fn email_validation() {
        assert!(EmailClaim::new("ada@example.org").is_ok());
        assert!(EmailClaim::new("ada.example.org").is_err());
        assert!(EmailClaim::new("@example.org").is_err());
        assert!(EmailClaim::new("ada@org").is_err());
        assert!(EmailClaim::new("ada @example.org").is_err());
    }

    #[test]
    fn age_predicate() {
        let adult = KycClaim::Age(AgeClaim::new(NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(), 18));
        assert!(adult.check().is_ok());
        let minor_birth = Utc::now().date_naive() - chrono::Duration::days(365 * 10);
        let minor = KycClaim::Age(AgeClaim::new(minor_birth, 18));
        assert!(minor.check().is_err());
    }

    #[test]
    fn age_counts_birthday() {
        let claim = AgeClaim::new(NaiveDate::from_ymd_opt(2000, 6, 15).unwrap(), 18);
        assert_eq!(claim.age_on(NaiveDate::from_ymd_opt(2018, 6, 14).unwrap()), 17);
        assert_eq!(claim.age_on(NaiveDate::from_ymd_opt(2018, 6, 15).unwrap()), 18);
    }

    #[test]
    fn deserialized_claims_are_rechecked() {
        let forged: KycClaim =
            serde_json::from_value(json!({"type": "residency", "country": "not-a-country"}))
                .unwrap();
        assert!(forged.check().is_err());
    }

    #[test]
    fn personal_data_stays_private() {
        let claim = KycClaim::Email(EmailClaim::new("ada@example.org").unwrap());
        assert_eq!(claim.public_inputs(), json!({}));
        assert_eq!(claim.private_inputs()["address"], "ada@example.org");
        assert_eq!(claim.claim_type(), ClaimType::Email);
    }
}
