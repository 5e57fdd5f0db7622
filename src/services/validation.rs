use once_cell::sync::Lazy;
use regex::Regex;

use crate::database::entities::{BaseMap, FoldState};
use crate::errors::{CatalogError, CatalogResult};

/// Color given to layer groups that do not choose one
pub const DEFAULT_GROUP_COLOR: &str = "#E3E3E3";

pub const COLOR_PATTERN: &str = r"^#([0-9A-Fa-f]{6}|[0-9A-Fa-f]{3})$";

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_SHORT_KEY_LEN: usize = 50;
pub const MAX_URL_LEN: usize = 500;
pub const MAX_METADATA_REF_LEN: usize = 500;
pub const MAX_ZOOM_LEVEL: f64 = 22.0;

static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(COLOR_PATTERN).expect("color pattern is valid"));
static SHORT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("short key pattern is valid"));

/// Stateless validation and normalisation of catalog input
pub struct ValidationService;

impl ValidationService {
    /// Validate a hex color and return its uppercase form.
    pub fn normalize_color(color: &str) -> CatalogResult<String> {
        if !COLOR_RE.is_match(color) {
            return Err(CatalogError::field(
                "color",
                format!(
                    "Enter a valid hexadecimal color code (e.g., #FF5733 or #F57); expected pattern {}",
                    COLOR_PATTERN
                ),
            ));
        }
        Ok(color.to_ascii_uppercase())
    }

    /// Normalise an optional color, substituting the default when it is
    /// absent or blank.
    pub fn resolve_color(color: Option<&str>) -> CatalogResult<String> {
        match color {
            None => Ok(DEFAULT_GROUP_COLOR.to_string()),
            Some(c) if c.is_empty() => Ok(DEFAULT_GROUP_COLOR.to_string()),
            Some(c) => Self::normalize_color(c),
        }
    }

    pub fn validate_name(field: &str, value: &str) -> CatalogResult<String> {
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(CatalogError::field(field, format!("{} cannot be empty", field)));
        }

        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(CatalogError::field(
                field,
                format!("{} is too long (max {} characters)", field, MAX_NAME_LEN),
            ));
        }

        if trimmed.chars().any(|c| c.is_control()) {
            return Err(CatalogError::field(
                field,
                format!("{} cannot contain control characters", field),
            ));
        }

        Ok(trimmed.to_string())
    }

    pub fn validate_short_key(short_key: &str) -> CatalogResult<String> {
        let trimmed = short_key.trim();

        if trimmed.is_empty() {
            return Err(CatalogError::field("short_key", "short_key cannot be empty"));
        }

        if trimmed.len() > MAX_SHORT_KEY_LEN {
            return Err(CatalogError::field(
                "short_key",
                format!("short_key is too long (max {} characters)", MAX_SHORT_KEY_LEN),
            ));
        }

        if !SHORT_KEY_RE.is_match(trimmed) {
            return Err(CatalogError::field(
                "short_key",
                "short_key can only contain letters, numbers, hyphens and underscores",
            ));
        }

        Ok(trimmed.to_string())
    }

    pub fn validate_zoom_level(zoom: f64) -> CatalogResult<f64> {
        if !zoom.is_finite() || !(0.0..=MAX_ZOOM_LEVEL).contains(&zoom) {
            return Err(CatalogError::field(
                "zoom_level",
                format!("zoom_level must be between 0 and {}", MAX_ZOOM_LEVEL),
            ));
        }
        Ok(zoom)
    }

    pub fn validate_coordinate(field: &str, value: f64) -> CatalogResult<f64> {
        if !value.is_finite() {
            return Err(CatalogError::field(
                field,
                format!("{} must be a finite number", field),
            ));
        }
        Ok(value)
    }

    /// Optional absolute http(s) URL; blank strings count as absent.
    pub fn validate_url(field: &str, url: Option<&str>) -> CatalogResult<Option<String>> {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        if url.len() > MAX_URL_LEN {
            return Err(CatalogError::field(
                field,
                format!("{} is too long (max {} characters)", field, MAX_URL_LEN),
            ));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CatalogError::field(
                field,
                format!("{} must be an http or https URL", field),
            ));
        }

        Ok(Some(url.to_string()))
    }

    pub fn validate_metadata_ref(metadata_ref: Option<&str>) -> CatalogResult<Option<String>> {
        let Some(value) = metadata_ref.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        if value.chars().count() > MAX_METADATA_REF_LEN {
            return Err(CatalogError::field(
                "metadata_ref",
                format!(
                    "metadata_ref is too long (max {} characters)",
                    MAX_METADATA_REF_LEN
                ),
            ));
        }

        Ok(Some(value.to_string()))
    }

    pub fn validate_base_map(base_map: &str) -> CatalogResult<BaseMap> {
        BaseMap::from_str(base_map).ok_or_else(|| {
            let known: Vec<&str> = BaseMap::ALL.iter().map(|b| b.as_str()).collect();
            CatalogError::field(
                "base_map",
                format!(
                    "Unknown base map '{}'. Valid values: {}",
                    base_map,
                    known.join(", ")
                ),
            )
        })
    }

    pub fn validate_fold_state(fold_state: &str) -> CatalogResult<FoldState> {
        FoldState::from_str(fold_state).ok_or_else(|| {
            CatalogError::field(
                "fold_state",
                format!(
                    "Unknown fold state '{}'. Valid values: expanded, collapsed",
                    fold_state
                ),
            )
        })
    }
}
