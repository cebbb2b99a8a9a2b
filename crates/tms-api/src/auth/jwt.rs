//! JWT token generation and validation
//!
//! Access tokens are HS256-signed claim sets carrying the user id and role.
//! They are stateless: validity is decided by signature, type tag and expiry
//! alone, so a token stays usable until it expires even if the account
//! changes in the meantime.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tms_core::{AuthConfig, Role};

/// Value of the `type` claim on access tokens
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub role: Role,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
    /// Token purpose; only `access` is accepted by [`validate_access_token`]
    #[serde(rename = "type")]
    pub token_type: String,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token is not an access token")]
    WrongTokenType,
}

/// Signing secret and lifetime of access tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_expiration_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from_auth_config(&AuthConfig::default())
    }
}

impl JwtConfig {
    pub fn from_auth_config(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.jwt_secret.clone(),
            access_expiration_secs: auth.access_token_ttl_secs,
        }
    }
}

/// Sign an access token for `user_id` valid from now
pub fn generate_access_token(
    config: &JwtConfig,
    user_id: i64,
    role: Role,
) -> Result<String, JwtError> {
    generate_access_token_at(config, user_id, role, chrono::Utc::now().timestamp())
}

/// Sign an access token as if issued at `issued_at`
pub fn generate_access_token_at(
    config: &JwtConfig,
    user_id: i64,
    role: Role,
    issued_at: i64,
) -> Result<String, JwtError> {
    let claims = Claims {
        user_id,
        role,
        iat: issued_at,
        exp: issued_at + config.access_expiration_secs,
        token_type: ACCESS_TOKEN_TYPE.to_string(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate signature, expiry and type tag, then return the claims
pub fn validate_access_token(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    if token_data.claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(JwtError::WrongTokenType);
    }

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            access_expiration_secs: 900,
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let token = generate_access_token(&config(), 42, Role::Manager).unwrap();
        let claims = validate_access_token(&config(), &token).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_invalid_token() {
        let result = validate_access_token(&config(), "invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let token = generate_access_token(&config(), 1, Role::Staff).unwrap();
        let other = JwtConfig {
            secret: "another-secret".to_string(),
            ..config()
        };

        let result = validate_access_token(&other, &token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token() {
        let issued = chrono::Utc::now().timestamp() - 3600;
        let token = generate_access_token_at(&config(), 1, Role::Staff, issued).unwrap();

        let result = validate_access_token(&config(), &token);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_rejects_other_token_type() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            user_id: 1,
            role: Role::Admin,
            iat: now,
            exp: now + 900,
            token_type: "refresh".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = validate_access_token(&config(), &token);
        assert!(matches!(result, Err(JwtError::WrongTokenType)));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::Manager), Just(Role::Staff)]
    }

    proptest! {
        #[test]
        fn round_trip_preserves_identity(user_id in 1i64..i64::MAX / 2, role in any_role()) {
            let token = generate_access_token(&config(), user_id, role).unwrap();
            let claims = validate_access_token(&config(), &token).unwrap();
            prop_assert_eq!(claims.user_id, user_id);
            prop_assert_eq!(claims.role, role);
        }
    }
}
