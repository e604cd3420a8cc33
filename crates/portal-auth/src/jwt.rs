//! JWT (JSON Web Token) session handling

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `token_type` claim carried by browser/API session tokens
pub const SESSION_TOKEN_TYPE: &str = "session";

/// Issuer written into every session token
pub const SESSION_ISSUER: &str = "onboarding-portal";

/// Audience written into every session token
pub const SESSION_AUDIENCE: &str = "onboarding-portal-web";

/// JWT claims for an authenticated portal session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject (account UUID)
    pub sub: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Account email at the time of issue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Account role at the time of issue (canonical form)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Token type ("session")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Whether the account had to change its password when the token was issued
    #[serde(default)]
    pub must_change_password: bool,
}

impl SessionClaims {
    pub fn new(account_id: String, validity: Duration) -> Self {
        let now = Utc::now();
        let exp = now + validity;

        Self {
            sub: account_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: SESSION_ISSUER.to_string(),
            aud: SESSION_AUDIENCE.to_string(),
            email: None,
            role: None,
            token_type: None,
            must_change_password: false,
        }
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_role(mut self, role: String) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_token_type(mut self, token_type: String) -> Self {
        self.token_type = Some(token_type);
        self
    }

    pub fn with_must_change_password(mut self, must_change: bool) -> Self {
        self.must_change_password = must_change;
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Expiry as a UTC timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

/// JWT validator
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Create a new JWT validator using HMAC-SHA256 (symmetric secret)
    ///
    /// Validates signature, expiration and the portal issuer. Audience and
    /// not-before are not checked.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[SESSION_ISSUER]);

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::InvalidToken,
            })?;

        if token_data.claims.is_expired() {
            return Err(JwtError::TokenExpired);
        }

        Ok(token_data.claims)
    }

    /// Encode JWT using HMAC-SHA256 (symmetric secret)
    pub fn encode(secret: &[u8], claims: &SessionClaims) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(secret);

        Ok(encode(&header, claims, &encoding_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_1234567890";

    fn session_claims(validity: Duration) -> SessionClaims {
        SessionClaims::new("account-123".to_string(), validity)
            .with_email("ops@acme.test".to_string())
            .with_role("admin".to_string())
            .with_token_type(SESSION_TOKEN_TYPE.to_string())
    }

    #[test]
    fn test_jwt_encode_decode() {
        let claims = session_claims(Duration::hours(1));
        let token = JwtValidator::encode(TEST_SECRET, &claims).unwrap();

        let decoded = JwtValidator::new(TEST_SECRET).validate(&token).unwrap();

        assert_eq!(decoded.sub, "account-123");
        assert_eq!(decoded.email.as_deref(), Some("ops@acme.test"));
        assert_eq!(decoded.role.as_deref(), Some("admin"));
        assert_eq!(decoded.token_type.as_deref(), Some(SESSION_TOKEN_TYPE));
        assert!(!decoded.must_change_password);
    }

    #[test]
    fn test_must_change_password_claim_survives_roundtrip() {
        let claims = session_claims(Duration::hours(1)).with_must_change_password(true);
        let token = JwtValidator::encode(TEST_SECRET, &claims).unwrap();

        let decoded = JwtValidator::new(TEST_SECRET).validate(&token).unwrap();
        assert!(decoded.must_change_password);
    }

    #[test]
    fn test_expired_token() {
        let claims = session_claims(Duration::seconds(-10));
        assert!(claims.is_expired());

        let token = JwtValidator::encode(TEST_SECRET, &claims).unwrap();
        let result = JwtValidator::new(TEST_SECRET).validate(&token);

        assert!(matches!(result, Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = session_claims(Duration::hours(1));
        let token = JwtValidator::encode(b"another-secret", &claims).unwrap();

        let result = JwtValidator::new(TEST_SECRET).validate(&token);
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let result = JwtValidator::new(TEST_SECRET).validate("not.a.jwt");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut claims = session_claims(Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = JwtValidator::encode(TEST_SECRET, &claims).unwrap();

        assert!(JwtValidator::new(TEST_SECRET).validate(&token).is_err());
    }

    #[test]
    fn test_optional_claims_skipped_when_none() {
        let claims = SessionClaims::new("account-1".to_string(), Duration::hours(1));
        let json = serde_json::to_string(&claims).unwrap();

        assert!(!json.contains("\"email\""));
        assert!(!json.contains("\"role\""));
        assert!(!json.contains("\"token_type\""));
    }
}
