//! Tenantry Auth - admin password hashing, access tokens and login

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::{AuthConfig, JwtAlgorithm};
pub use error::AuthError;
pub use password::Argon2Hasher;
pub use service::{AdminPrincipal, AuthService, LoginOutput};
pub use token::JwtTokenService;
