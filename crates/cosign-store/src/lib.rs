//! # cosign-store: Storage Boundary
//!
//! The transactional collection store every component persists through:
//!
//! - [`Storage`] / [`Transaction`]: async traits for the external store.
//! - [`MemoryStore`]: in-process implementation with serialized writers,
//!   atomic commit and rollback on drop.
//! - [`Record`] with [`load`], [`load_committed`], [`save`], [`load_all`]:
//!   typed access for domain records.
//! - [`bounded`]: deadline wrapper used around every storage call.
//!
//! Storage is the single source of truth. In-memory indexes elsewhere are
//! caches rebuilt from it.

pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::StorageError;
pub use memory::{MemoryStore, MemoryTransaction};
pub use record::{load, load_all, load_committed, save, Record};
pub use traits::{bounded, Storage, Transaction};
