//! Single-use password reset tokens
//!
//! The plaintext token only ever travels in the reset email. The account
//! record stores the SHA-256 digest and an expiry; both are cleared once the
//! token is consumed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// Freshly issued reset token
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Plaintext token, embedded in the reset link
    pub token: String,
    /// SHA-256 hex digest persisted on the account
    pub token_hash: String,
    /// Instant after which the token no longer authenticates a reset
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// Issue a new random token valid for `ttl`
    pub fn issue(ttl: Duration) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        let token = URL_SAFE_NO_PAD.encode(bytes);
        let token_hash = hash_token(&token);

        Self {
            token,
            token_hash,
            expires_at: Utc::now() + ttl,
        }
    }
}

/// SHA-256 hex digest of a plaintext token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_produces_url_safe_token() {
        let issued = ResetToken::issue(Duration::minutes(30));

        assert_eq!(issued.token.len(), 43);
        assert!(issued
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn test_hash_matches_issued_digest() {
        let issued = ResetToken::issue(Duration::minutes(30));

        assert_eq!(hash_token(&issued.token), issued.token_hash);
        assert_eq!(issued.token_hash.len(), 64);
        assert_ne!(issued.token, issued.token_hash);
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = ResetToken::issue(Duration::minutes(30));
        let b = ResetToken::issue(Duration::minutes(30));
        assert_ne!(a.token, b.token);
    }
}
