//! Human-readable account and customer identifiers
//!
//! Codes are a fixed prefix followed by 8 characters drawn uniformly from
//! `[A-Z0-9]`. Generation is pure; callers own the uniqueness check against
//! what is already persisted.

use rand::Rng;

/// Prefix of generated onboarding customer identifiers
pub const CUSTOMER_ID_PREFIX: &str = "CS-";

/// Prefix of generated staff/admin account codes
pub const STAFF_CODE_PREFIX: &str = "ST-";

/// Number of random characters after the prefix
pub const CODE_LENGTH: usize = 8;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draw a new code with the given prefix
///
/// ```
/// use portal_auth::{generate_code, is_valid_code, CUSTOMER_ID_PREFIX};
///
/// let id = generate_code(CUSTOMER_ID_PREFIX, &mut rand::thread_rng());
/// assert!(is_valid_code(CUSTOMER_ID_PREFIX, &id));
/// ```
pub fn generate_code<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let mut code = String::with_capacity(prefix.len() + CODE_LENGTH);
    code.push_str(prefix);

    for _ in 0..CODE_LENGTH {
        let idx = rng.gen_range(0..ALPHABET.len());
        code.push(char::from(ALPHABET[idx]));
    }

    code
}

/// Whether `code` is `prefix` followed by exactly 8 characters of `[A-Z0-9]`
pub fn is_valid_code(prefix: &str, code: &str) -> bool {
    match code.strip_prefix(prefix) {
        Some(rest) => {
            rest.len() == CODE_LENGTH
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn test_customer_id_format() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let id = generate_code(CUSTOMER_ID_PREFIX, &mut rng);
            assert!(id.starts_with("CS-"));
            assert_eq!(id.len(), 11);
            assert!(is_valid_code(CUSTOMER_ID_PREFIX, &id), "bad id {id}");
        }
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let a = generate_code(STAFF_CODE_PREFIX, &mut StdRng::seed_from_u64(7));
        let b = generate_code(STAFF_CODE_PREFIX, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_alphabet_is_fully_used() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let id = generate_code(CUSTOMER_ID_PREFIX, &mut rng);
            seen.extend(id[CUSTOMER_ID_PREFIX.len()..].chars());
        }
        assert_eq!(seen.len(), ALPHABET.len());
    }

    #[test]
    fn test_is_valid_code_rejects_malformed() {
        assert!(!is_valid_code(CUSTOMER_ID_PREFIX, "CS-ABC"));
        assert!(!is_valid_code(CUSTOMER_ID_PREFIX, "CS-abcdefgh"));
        assert!(!is_valid_code(CUSTOMER_ID_PREFIX, "ST-ABCDEFGH"));
        assert!(!is_valid_code(CUSTOMER_ID_PREFIX, "CS-ABCDEFGH1"));
        assert!(is_valid_code(CUSTOMER_ID_PREFIX, "CS-AB12CD34"));
    }
}
