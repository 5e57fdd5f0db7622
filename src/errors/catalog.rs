//! Catalog error types
//!
//! Every failure the layer catalog can report, from malformed input through
//! broken tree structure to storage and upstream outages.
//!
//! # Examples
//!
//! ```rust
//! use visor::errors::CatalogError;
//!
//! let err = CatalogError::field("color", "expected #RGB or #RRGGBB");
//! assert!(err.is_client_error());
//! assert_eq!(err.code(), "VALIDATION_ERROR");
//!
//! let err = CatalogError::not_found("layer group", 42);
//! assert_eq!(err.to_string(), "layer group 42 not found");
//! ```

use thiserror::Error;

/// Layer catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Bad input shape or value
    #[error("{message}")]
    Validation {
        /// Offending field, when the error is tied to one
        field: Option<String>,
        message: String,
    },

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// Parent/child or group/layer project mismatch
    #[error("{0}")]
    CrossProject(String),

    /// The write would introduce a cycle in the group tree
    #[error("{0}")]
    CyclicReference(String),

    /// Stored tree is malformed; raised by the traversal cycle guard
    #[error("Invalid group tree structure: {0}")]
    Structural(String),

    /// Unique key or association already taken
    #[error("{0}")]
    Conflict(String),

    /// External dependency failed or timed out
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Storage operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CatalogError::Validation { .. }
                | CatalogError::NotFound { .. }
                | CatalogError::CrossProject(_)
                | CatalogError::CyclicReference(_)
                | CatalogError::Conflict(_)
        )
    }

    /// Stable machine-readable code carried in error responses
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Validation { .. } => "VALIDATION_ERROR",
            CatalogError::NotFound { .. } => "NOT_FOUND",
            CatalogError::CrossProject(_) => "CROSS_PROJECT_PARENT",
            CatalogError::CyclicReference(_) => "CYCLIC_REFERENCE",
            CatalogError::Structural(_) => "STRUCTURAL_ERROR",
            CatalogError::Conflict(_) => "CONFLICT",
            CatalogError::Upstream(_) => "UPSTREAM_ERROR",
            CatalogError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Short human-readable category used as the `error` field
    pub fn title(&self) -> &'static str {
        match self {
            CatalogError::Validation { .. } => "Validation Error",
            CatalogError::NotFound { .. } => "Not Found",
            CatalogError::CrossProject(_) => "Cross Project Reference",
            CatalogError::CyclicReference(_) => "Cyclic Reference",
            CatalogError::Structural(_) => "Structural Error",
            CatalogError::Conflict(_) => "Conflict",
            CatalogError::Upstream(_) => "Upstream Error",
            CatalogError::Database(_) => "Database Error",
        }
    }

    pub fn field_name(&self) -> Option<&str> {
        match self {
            CatalogError::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(CatalogError::validation("bad").is_client_error());
        assert!(CatalogError::not_found("project", 1).is_client_error());
        assert!(CatalogError::CrossProject("x".into()).is_client_error());
        assert!(CatalogError::CyclicReference("x".into()).is_client_error());
        assert!(CatalogError::Conflict("x".into()).is_client_error());
        assert!(!CatalogError::Structural("x".into()).is_client_error());
        assert!(!CatalogError::Upstream("x".into()).is_client_error());
        assert!(!CatalogError::Database(sea_orm::DbErr::Custom("x".into())).is_client_error());
    }

    #[test]
    fn test_not_found_message() {
        let err = CatalogError::not_found("layer group", 7);
        assert_eq!(err.to_string(), "layer group 7 not found");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_field_name_only_on_validation() {
        assert_eq!(
            CatalogError::field("color", "bad").field_name(),
            Some("color")
        );
        assert_eq!(CatalogError::validation("bad").field_name(), None);
        assert_eq!(CatalogError::Conflict("dup".into()).field_name(), None);
    }
}
