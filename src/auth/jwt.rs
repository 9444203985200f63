//! Session token issuance and verification (HS256 JWT)

use crate::{config::SecurityConfig, error::AppError, models::Role};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,

    /// Role the account was registered under
    pub role: Role,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID (unique token identifier)
    pub jti: String,
}

impl Claims {
    pub fn account_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly minted token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// seconds until the token expires
    pub expires_in: u64,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    /// Create JWT service from the security section of the config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        Self::new(config.jwt_secret.expose_secret(), config.token_ttl_secs)
    }

    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, AppError> {
        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let ttl_secs = i64::try_from(ttl_secs)
            .map_err(|_| AppError::Config("token ttl out of range".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(ttl_secs),
        })
    }

    /// Token lifetime in seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.num_seconds().max(0) as u64
    }

    /// Issue a token bound to an account, valid from now
    pub fn issue(&self, role: Role, account_id: Uuid) -> Result<IssuedToken, AppError> {
        self.issue_at(role, account_id, Utc::now())
    }

    /// Issue a token as if minted at `issued_at`
    pub fn issue_at(
        &self,
        role: Role,
        account_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let expires_at = issued_at + self.ttl;

        let claims = Claims {
            sub: account_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("Failed to encode session token: {:?}", e);
                AppError::Internal(format!("Failed to encode session token: {}", e))
            })?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: remaining_secs(expires_at),
        })
    }

    /// Validate signature, structure and expiry, and decode the claims
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                AppError::InvalidToken
            })
    }
}

/// Whole seconds left until `expires_at`, rounded up
fn remaining_secs(expires_at: DateTime<Utc>) -> u64 {
    let millis = (expires_at - Utc::now()).num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_32_characters_long!";

    #[test]
    fn test_issue_and_verify() {
        let service = JwtService::new(SECRET, 3600).unwrap();
        let account_id = Uuid::new_v4();

        let issued = service.issue(Role::Volunteer, account_id).unwrap();
        let claims = service.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.role, Role::Volunteer);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.account_id().unwrap(), account_id);
        assert!(issued.expires_in <= 3600 && issued.expires_in >= 3590);
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtService::new("short", 3600).is_err());
    }

    #[test]
    fn test_invalid_token_fails() {
        let service = JwtService::new(SECRET, 3600).unwrap();
        assert!(matches!(service.verify("invalid_token"), Err(AppError::InvalidToken)));
        assert!(matches!(service.verify(""), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_tampered_token_fails() {
        let service = JwtService::new(SECRET, 3600).unwrap();
        let issued = service.issue(Role::Admin, Uuid::new_v4()).unwrap();

        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();
        let mut sig = parts[2].clone().into_bytes();
        sig[5] = if sig[5] == b'a' { b'b' } else { b'a' };
        parts[2] = String::from_utf8(sig).unwrap();

        assert!(service.verify(&parts.join(".")).is_err());
    }
}
