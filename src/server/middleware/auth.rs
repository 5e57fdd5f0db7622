use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;

use crate::errors::ApiError;
use crate::server::app::AppState;

/// Guard for write endpoints.
///
/// When an admin token is configured the request must carry
/// `Authorization: Bearer <token>`; without one, access is open.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

#[async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Ok(AdminAccess);
        };

        let provided = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match provided {
            Some(token) if token_matches(token, expected) => Ok(AdminAccess),
            Some(_) => {
                debug!("Rejected write with an invalid admin token");
                Err(ApiError::unauthorized("Invalid admin token"))
            }
            None => Err(ApiError::unauthorized(
                "Authentication credentials were not provided",
            )),
        }
    }
}

/// Compare without short-circuiting on the first differing byte.
fn token_matches(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("secret", "secret"));
        assert!(!token_matches("secreT", "secret"));
        assert!(!token_matches("secret2", "secret"));
        assert!(!token_matches("", "secret"));
    }
}
