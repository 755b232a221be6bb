//! # cosign-did: DID Manager
//!
//! Self-controlled DIDs of the form `did:<method>:<address>`, where the
//! address is derived from the creating Ed25519 key.
//!
//! - [`DidManager`]: create, resolve, signed update, revoke.
//! - [`DidDocument`]: the W3C-shaped document and its structural checks.
//! - [`DidPatch`] / [`SignedDidPatch`]: versioned, controller-signed edits.

#![deny(missing_docs)]

pub mod document;
pub mod error;
pub mod manager;
pub mod patch;

pub use document::{
    DidDocument, Service, VerificationMethod, DID_CONTEXT, ED25519_METHOD_TYPE,
    PRIMARY_KEY_FRAGMENT,
};
pub use error::DidError;
pub use manager::{DidManager, DidRecord, DidStatus, DEFAULT_STORAGE_TIMEOUT};
pub use patch::{DidPatch, NewVerificationMethod, SignedDidPatch};
