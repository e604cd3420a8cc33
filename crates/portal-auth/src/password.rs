//! Password hashing, verification and complexity policy

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

/// Minimum number of characters accepted by the password policy
pub const MIN_PASSWORD_LENGTH: usize = 8;

const TEMPORARY_PASSWORD_LENGTH: usize = 14;
const UPPERCASE: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
const DIGITS: &[u8] = b"23456789";
const SYMBOLS: &[u8] = b"!@#$%^&*-_+=?";

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// First rule of the password policy that a candidate password breaks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters long")]
    TooShort,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one symbol")]
    MissingSymbol,
}

/// Hash a password using Argon2id
///
/// Uses the default Argon2id parameters with a random 16 byte salt per call,
/// so hashing the same password twice yields two different PHC strings.
///
/// # Example
/// ```
/// use portal_auth::password::hash_password;
///
/// let hash = hash_password("MySecurePassword123!").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a password against a PHC-formatted hash
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash
/// itself cannot be parsed or checked.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Check a candidate password against the portal's complexity policy
///
/// The policy is: at least 8 characters, at least one uppercase letter and at
/// least one symbol (any character that is neither alphanumeric nor
/// whitespace). Every password-setting path calls this before hashing.
pub fn validate_password_policy(password: &str) -> Result<(), PasswordPolicyError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort);
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordPolicyError::MissingUppercase);
    }

    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        return Err(PasswordPolicyError::MissingSymbol);
    }

    Ok(())
}

/// Generate a random password that always satisfies the policy
///
/// Used for admin-created accounts, which are flagged to change it on first login.
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    let all: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS].concat();

    let mut chars: Vec<u8> = vec![
        UPPERCASE[rng.gen_range(0..UPPERCASE.len())],
        LOWERCASE[rng.gen_range(0..LOWERCASE.len())],
        DIGITS[rng.gen_range(0..DIGITS.len())],
        SYMBOLS[rng.gen_range(0..SYMBOLS.len())],
    ];

    while chars.len() < TEMPORARY_PASSWORD_LENGTH {
        chars.push(all[rng.gen_range(0..all.len())]);
    }

    chars.shuffle(&mut rng);
    chars.into_iter().map(char::from).collect()
}
