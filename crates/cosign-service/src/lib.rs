//! # cosign-service: Composition Point
//!
//! Assembles the DID Manager, Signer Registry and Document Co-Signer over
//! caller-supplied Storage and Proof Oracle backends, and exposes the
//! request/response operations a presentation layer consumes.
//!
//! ```ignore
//! let config = CosignConfig::from_env()?;
//! telemetry::init_tracing(config.log_format)?;
//! let service = CosignService::open(config, storage, oracle).await?;
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::{ConfigError, CosignConfig, LogFormat};
pub use error::ServiceError;
pub use service::CosignService;
pub use telemetry::init_tracing;
