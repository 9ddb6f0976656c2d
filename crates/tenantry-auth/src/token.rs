//! JWT access token issuance and verification.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tenantry_core::{AdminId, OrganizationId, TokenClaims, TokenService};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// HMAC-signed JWT token service.
///
/// Claims are `{admin_id, org_id, iat, exp}`; `exp` is always validated.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    ttl_secs: u64,
}

impl JwtTokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            algorithm: config.jwt_algorithm.into(),
            ttl_secs: config.token_ttl_secs,
        }
    }

    /// Issue a token for an admin.
    pub fn issue_access_token(
        &self,
        admin_id: &AdminId,
        org_id: OrganizationId,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            admin_id: admin_id.clone(),
            org_id,
            iat: now,
            exp: now + self.ttl_secs as i64,
        };

        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Decode and verify a token.
    pub fn decode_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, admin_id: &AdminId, org_id: OrganizationId) -> tenantry_core::Result<String> {
        Ok(self.issue_access_token(admin_id, org_id)?)
    }

    fn verify(&self, token: &str) -> tenantry_core::Result<TokenClaims> {
        Ok(self.decode_access_token(token)?)
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtAlgorithm;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_algorithm: JwtAlgorithm::HS256,
            token_ttl_secs: 900,
        }
    }

    #[test]
    fn jwt_roundtrip() {
        let service = JwtTokenService::new(&test_config());
        let admin = AdminId::from("admin_a@acme.com_1");
        let org = OrganizationId::new();

        let token = service.issue_access_token(&admin, org).unwrap();
        let claims = service.decode_access_token(&token).unwrap();

        assert_eq!(claims.admin_id, admin);
        assert_eq!(claims.org_id, org);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let service = JwtTokenService::new(&test_config());
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            admin_id: AdminId::from("admin_x"),
            org_id: OrganizationId::new(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            service.decode_access_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn forged_token_is_invalid() {
        let service = JwtTokenService::new(&test_config());
        let other = JwtTokenService::new(&AuthConfig {
            jwt_secret: "other-secret".into(),
            ..test_config()
        });
        let token = other
            .issue_access_token(&AdminId::from("admin_x"), OrganizationId::new())
            .unwrap();

        assert!(matches!(
            service.decode_access_token(&token),
            Err(AuthError::TokenInvalid(_))
        ));
        assert!(matches!(
            service.decode_access_token("not.a.token"),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn algorithm_mismatch_is_invalid() {
        let hs512 = JwtTokenService::new(&AuthConfig {
            jwt_algorithm: JwtAlgorithm::HS512,
            ..test_config()
        });
        let token = hs512
            .issue_access_token(&AdminId::from("admin_x"), OrganizationId::new())
            .unwrap();

        let hs256 = JwtTokenService::new(&test_config());
        assert!(matches!(
            TokenService::verify(&hs256, &token),
            Err(tenantry_core::Error::Unauthorized(_))
        ));
    }
}
