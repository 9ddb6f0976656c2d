//! HTTP error mapping
//!
//! Every handler error goes through [`ApiError`], so the status mapping and
//! the `{"error": {message, type, code}}` body live in one place.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tenantry_core::Error;

/// Handler error wrapping the core taxonomy
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::OrganizationExists(_) | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            Error::NotFound(_) => "Organization not found".to_string(),
            Error::OrganizationExists(_) => "Organization name already exists".to_string(),
            Error::InvalidRequest(msg) => msg.clone(),
            Error::Unauthorized(msg) => msg.clone(),
            Error::Forbidden(msg) => msg.clone(),
            Error::InvariantViolation(msg) => msg.clone(),
            Error::MigrationAborted(report) => format!("Region migration aborted: {}", report),
            // Storage and internal details stay in the logs
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.kind(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, kind = self.0.kind(), "Request rejected");
        }

        let body = json!({
            "error": {
                "message": self.message(),
                "type": self.0.kind(),
                "code": status.as_u16(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::OrganizationExists("org_x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (Error::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (Error::InvariantViolation("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::UniqueViolation("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err = ApiError(Error::Database("password=hunter2 host=db".into()));
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_invariant_violation_message_is_kept() {
        let err = ApiError(Error::InvariantViolation(
            "Admin record missing for organization".into(),
        ));
        assert_eq!(err.message(), "Admin record missing for organization");
    }
}
