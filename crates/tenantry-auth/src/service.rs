//! Authentication service: admin login and bearer token resolution.

use std::sync::Arc;

use tenantry_core::credential::normalize_email;
use tenantry_core::{
    AdminId, CredentialDirectory, CredentialHasher, Error, OrganizationId, Result, TokenService,
};

use crate::error::AuthError;

/// Successful login result.
#[derive(Debug, Clone)]
pub struct LoginOutput {
    /// Signed access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// An admin whose bearer token was verified against the credential directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub admin_id: AdminId,
    pub org_id: OrganizationId,
}

/// Authentication service.
///
/// Works against the collaborator traits only, so the auth layer has no
/// dependency on a storage backend.
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialDirectory>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: Arc<dyn TokenService>,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialDirectory>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            credentials,
            hasher,
            tokens,
        }
    }

    /// Authenticate an admin with email + password and issue an access token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutput> {
        let email = normalize_email(email);

        let Some(admin) = self.credentials.find_by_email(&email).await? else {
            tracing::debug!(email = %email, "Login for unknown admin");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !self.hasher.verify(password, &admin.password_hash) {
            tracing::debug!(admin_id = %admin.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let access_token = self.tokens.issue(&admin.id, admin.organization_id)?;
        tracing::info!(admin_id = %admin.id, org_id = %admin.organization_id, "Admin logged in");

        Ok(LoginOutput {
            access_token,
            expires_in: self.tokens.ttl_secs(),
        })
    }

    /// Resolve a bearer token to a verified admin principal.
    ///
    /// # Errors
    /// - `Error::Unauthorized` if the token is invalid or expired, or the admin no longer exists
    /// - `Error::Forbidden` if the admin's organization differs from the token's
    pub async fn resolve_principal(&self, token: &str) -> Result<AdminPrincipal> {
        let claims = self.tokens.verify(token)?;

        let admin = self
            .credentials
            .find_by_id(&claims.admin_id)
            .await?
            .ok_or_else(|| Error::Unauthorized("admin not found".to_string()))?;

        if admin.organization_id != claims.org_id {
            tracing::warn!(
                admin_id = %admin.id,
                token_org = %claims.org_id,
                admin_org = %admin.organization_id,
                "Token organization does not match admin record"
            );
            return Err(Error::Forbidden(
                "token organization does not match admin".to_string(),
            ));
        }

        Ok(AdminPrincipal {
            admin_id: admin.id,
            org_id: admin.organization_id,
        })
    }

    pub fn hasher(&self) -> Arc<dyn CredentialHasher> {
        self.hasher.clone()
    }

    pub fn tokens(&self) -> Arc<dyn TokenService> {
        self.tokens.clone()
    }
}
