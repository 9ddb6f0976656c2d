//! Bearer token extractor

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tenantry_auth::AdminPrincipal;
use tenantry_core::Error;

use crate::app::AppState;
use crate::error::ApiError;

/// Admin verified from the `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub AdminPrincipal);

impl FromRequestParts<AppState> for AuthenticatedAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let principal = state.auth.resolve_principal(token).await?;
        Ok(Self(principal))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("Not authenticated".to_string()))?
        .to_str()
        .map_err(|_| Error::Unauthorized("Invalid authorization header".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| Error::Unauthorized("Invalid authorization header".to_string()))?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(Error::Unauthorized("Invalid authentication scheme".to_string()).into());
    }
    Ok(token)
}
