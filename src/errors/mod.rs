//! Error types for the layer catalog
//!
//! - **CatalogError**: domain failures raised by validation, tree building,
//!   services and probes
//! - **ApiError**: the HTTP-facing error, rendered as the
//!   `{error, message, code, path, timestamp}` envelope

pub mod api;
pub mod catalog;

pub use api::{ApiError, ErrorEnvelope};
pub use catalog::CatalogError;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
