//! Seam onto the host platform's identity provider (out of scope to build,
//! in scope to plug into — spec.md §1).

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;

/// Maps a bearer token to a stable user identifier. The real implementation
/// lives in the host platform; this crate only depends on the trait.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<Uuid, AppError>;
}

/// Extracts the bearer token from an `Authorization` header value.
pub fn extract_bearer(header_value: Option<&str>) -> Result<&str, AppError> {
    let value = header_value.ok_or(AppError::Unauthenticated)?;
    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthenticated)
}

/// Minimal verifier treating the bearer token itself as the user UUID. The
/// host platform's real identity provider is out of scope for this crate;
/// this stands in for it until one is wired up.
#[derive(Debug, Default)]
pub struct OpaqueUuidVerifier;

#[async_trait]
impl IdentityVerifier for OpaqueUuidVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<Uuid, AppError> {
        Uuid::parse_str(bearer_token).map_err(|_| AppError::Unauthenticated)
    }
}
