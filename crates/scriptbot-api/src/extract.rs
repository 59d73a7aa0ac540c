//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use scriptbot_core::error::DomainError;

use crate::error::ApiError;

/// Header naming the operator on whose behalf an administrative request runs.
pub const OWNER_HEADER: &str = "x-owner-id";

/// The operator identified by the `X-Owner-Id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError(DomainError::InvalidInput(
                    "missing X-Owner-Id header".into(),
                ))
            })?;

        raw.trim().parse().map(OwnerId).map_err(|_| {
            ApiError(DomainError::InvalidInput(format!(
                "X-Owner-Id must be an integer, got {raw:?}"
            )))
        })
    }
}
