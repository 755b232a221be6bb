//! Lowercase hex encoding shared by keys, signatures, digests and proofs.

use crate::error::ValidationError;

/// Render bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decode a hex string of any even length.
///
/// Surrounding whitespace is ignored and upper-case digits are accepted.
pub fn decode(hex: &str) -> Result<Vec<u8>, ValidationError> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(ValidationError::InvalidHex(format!(
            "odd length {}",
            hex.len()
        )));
    }
    if let Some(pos) = hex.find(|c: char| !c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidHex(format!(
            "non-hex character at position {pos}"
        )));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| ValidationError::InvalidHex(format!("position {i}: {e}")))
        })
        .collect()
}

/// Decode a hex string into a fixed-size array.
pub fn decode_array<const N: usize>(hex: &str) -> Result<[u8; N], ValidationError> {
    let bytes = decode(hex)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        ValidationError::InvalidHex(format!("expected {N} bytes, got {}", v.len()))
    })
}
