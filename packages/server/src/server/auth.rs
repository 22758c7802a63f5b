//! Caller identity extraction.
//!
//! Token verification (bearer tokens, blockchain signatures) happens in the
//! auth gateway in front of this service; by the time a request reaches
//! these handlers the verified account name rides in the `x-account`
//! header. This extractor is the single seam where a real verifier plugs
//! in.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// The authenticated account name of the caller
#[derive(Debug, Clone)]
pub struct AuthAccount(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthAccount
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = parts
            .headers
            .get("x-account")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match account {
            Some(account) => Ok(AuthAccount(account.to_string())),
            None => Err((StatusCode::UNAUTHORIZED, "missing x-account header")),
        }
    }
}
