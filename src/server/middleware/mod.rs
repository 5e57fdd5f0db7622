pub mod api_version;
pub mod auth;
pub mod error_envelope;
pub mod validation;

pub use api_version::api_version;
pub use auth::AdminAccess;
pub use error_envelope::error_envelope;
pub use validation::{ApiPath, ApiQuery, Validate, ValidatedJson};
