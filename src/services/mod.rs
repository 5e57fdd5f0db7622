pub mod catalog_query;
pub mod default_layer_service;
pub mod layer_group_service;
pub mod layer_service;
pub mod project_service;
pub mod validation;

pub use catalog_query::*;
pub use default_layer_service::*;
pub use layer_group_service::*;
pub use layer_service::*;
pub use project_service::*;
pub use validation::*;

use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Deserializer};

use crate::errors::CatalogError;

/// Deserialize a present field into `Some(value)`, so that a PATCH body can
/// tell an absent key (`None`) from an explicit `null` (`Some(None)`).
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Turn a unique-constraint failure on write into `Conflict`.
pub(crate) fn conflict_on_unique(err: DbErr, message: impl Into<String>) -> CatalogError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => CatalogError::Conflict(message.into()),
        _ => CatalogError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_some")]
        parent_group: Option<Option<i32>>,
    }

    #[test]
    fn test_absent_and_null_are_distinct() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"parent_group": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"parent_group": 4}"#).unwrap();
        assert_eq!(absent.parent_group, None);
        assert_eq!(null.parent_group, Some(None));
        assert_eq!(set.parent_group, Some(Some(4)));
    }
}
