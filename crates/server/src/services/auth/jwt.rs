//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying the account id and whether it is an admin
//! or a shop customer. An admin token is never accepted where a customer
//! token is expected, and vice versa.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::config::JwtConfig;

/// Lifetime of customer tokens.
pub const CUSTOMER_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Which kind of account a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Admin,
    Customer,
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    admin_ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("admin_ttl", &self.admin_ttl)
            .finish()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            admin_ttl: config.admin_ttl,
        }
    }

    /// Issue a token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if encoding fails.
    pub fn issue(&self, subject: Uuid, kind: TokenKind) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Admin => self.admin_ttl,
            TokenKind::Customer => CUSTOMER_TOKEN_TTL,
        };
        let iat = Utc::now().timestamp();
        let exp = iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        let claims = Claims {
            sub: subject,
            kind,
            iat,
            exp,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a token and require it to be of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the signature, expiry or kind do
    /// not check out.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        if data.claims.kind != kind {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: SecretString::from(secret.to_string()),
            admin_ttl: Duration::from_secs(3600),
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys("k8#Qz!2vLw9@Rt5^Yp1&Xm4*Bn7$Cs0%");
        let id = Uuid::new_v4();
        let token = keys.issue(id, TokenKind::Admin).unwrap();
        let claims = keys.verify(&token, TokenKind::Admin).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let keys = keys("k8#Qz!2vLw9@Rt5^Yp1&Xm4*Bn7$Cs0%");
        let token = keys.issue(Uuid::new_v4(), TokenKind::Customer).unwrap();
        assert!(matches!(
            keys.verify(&token, TokenKind::Admin),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = keys("k8#Qz!2vLw9@Rt5^Yp1&Xm4*Bn7$Cs0%")
            .issue(Uuid::new_v4(), TokenKind::Customer)
            .unwrap();
        let other = keys("Zr4!pQ8@wN2#vL6$kT0%hY3^jM7&bX1*");
        assert!(other.verify(&token, TokenKind::Customer).is_err());
    }

    #[test]
    fn test_customer_tokens_last_thirty_days() {
        let keys = keys("k8#Qz!2vLw9@Rt5^Yp1&Xm4*Bn7$Cs0%");
        let token = keys.issue(Uuid::new_v4(), TokenKind::Customer).unwrap();
        let claims = keys.verify(&token, TokenKind::Customer).unwrap();
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 60 * 60);
    }
}
