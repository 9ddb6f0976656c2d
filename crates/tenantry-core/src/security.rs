//! Credential hashing and token collaborator traits
//!
//! The lifecycle manager and the request surface depend on these traits
//! only; the concrete algorithms live in `tenantry-auth`.

use serde::{Deserialize, Serialize};

use crate::{Result, credential::AdminId, organization::OrganizationId};

/// Password hashing capability.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into an opaque, self-describing string
    ///
    /// # Errors
    /// - `Error::Credential` if the hash cannot be produced
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash
    ///
    /// Malformed hashes and mismatches both yield `false`.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub admin_id: AdminId,
    pub org_id: OrganizationId,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Access token issuance and verification.
pub trait TokenService: Send + Sync {
    /// Issue a signed token for an admin, valid for the configured lifetime
    fn issue(&self, admin_id: &AdminId, org_id: OrganizationId) -> Result<String>;

    /// Verify a token and return its claims
    ///
    /// # Errors
    /// - `Error::Unauthorized` if the token is expired, malformed or forged
    fn verify(&self, token: &str) -> Result<TokenClaims>;

    /// Configured token lifetime in seconds
    fn ttl_secs(&self) -> u64;
}
