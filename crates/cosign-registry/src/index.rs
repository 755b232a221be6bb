//! In-memory signer index.
//!
//! A cache over `verified_signers`, keyed by pseudonym and holding only
//! [`SignerView`]s, so it never maps a pseudonym to a DID. Storage stays the
//! source of truth: the index is filled after commits and rebuilt from
//! storage on startup. Views land after their commit has released the
//! writer, so a put never replaces a view with a newer `kyc_timestamp`.
//! Callers that act on eligibility re-read it inside their transaction. The
//! lock is `parking_lot` and is never held across `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use cosign_core::Pseudonym;
use parking_lot::RwLock;

use crate::records::SignerView;

/// Thread-safe, cloneable pseudonym index.
#[derive(Debug, Clone, Default)]
pub struct SignerIndex {
    data: Arc<RwLock<HashMap<Pseudonym, SignerView>>>,
}

impl SignerIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a view unless the cached one is newer.
    pub fn put(&self, view: SignerView) {
        let mut data = self.data.write();
        if let Some(current) = data.get(&view.pseudonym) {
            if current.kyc_timestamp > view.kyc_timestamp {
                return;
            }
        }
        data.insert(view.pseudonym.clone(), view);
    }

    /// Cached view for a pseudonym.
    pub fn get(&self, pseudonym: &Pseudonym) -> Option<SignerView> {
        self.data.read().get(pseudonym).cloned()
    }

    /// Replace the whole index.
    pub fn replace_all(&self, views: impl IntoIterator<Item = SignerView>) -> usize {
        let fresh: HashMap<_, _> = views
            .into_iter()
            .map(|v| (v.pseudonym.clone(), v))
            .collect();
        let n = fresh.len();
        *self.data.write() = fresh;
        n
    }

    /// Number of cached signers.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
