//! Authentication error types.

use tenantry_core::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => Error::Unauthorized(err.to_string()),
            AuthError::Crypto(msg) => Error::Credential(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_are_unauthorized() {
        assert!(matches!(
            Error::from(AuthError::TokenExpired),
            Error::Unauthorized(msg) if msg == "token has expired"
        ));
        assert!(matches!(
            Error::from(AuthError::InvalidCredentials),
            Error::Unauthorized(_)
        ));
    }

    #[test]
    fn crypto_errors_are_credential_errors() {
        assert!(matches!(
            Error::from(AuthError::Crypto("boom".into())),
            Error::Credential(msg) if msg == "boom"
        ));
    }
}
