//! Input normalization shared by the services

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;

// local part: RFC 5322 atom characters; domain: dot-separated labels, at least two
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$",
    )
    .expect("email pattern is a valid regex")
});

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Syntactic check on an already normalized address
pub fn is_email_valid(email: &str) -> bool {
    email.len() <= 320
        && !email.contains("..")
        && EMAIL_REGEX.is_match(email)
}

/// Normalize `raw` and reject it unless it is a syntactically valid address
pub fn require_email(field: &str, raw: Option<&str>) -> Result<String, ApiError> {
    let email = raw.map(normalize_email).unwrap_or_default();

    if email.is_empty() {
        return Err(ApiError::validation(field, format!("{field} is required")));
    }
    if !is_email_valid(&email) {
        return Err(ApiError::validation(
            field,
            format!("{field} must be a valid email address"),
        ));
    }

    Ok(email)
}

/// Like [`require_email`], but an absent or blank value is accepted as `None`
pub fn optional_email(field: &str, raw: Option<&str>) -> Result<Option<String>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => require_email(field, Some(value)).map(Some),
        None => Ok(None),
    }
}

/// Trim a free-text value, mapping blank to `None`
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ops@Acme.TEST "), "ops@acme.test");
    }

    #[test]
    fn test_valid_emails() {
        for email in [
            "ops@acme.test",
            "first.last+tag@sub.example.co.uk",
            "a_b-c@x-y.io",
        ] {
            assert!(is_email_valid(email), "{email} should be valid");
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "",
            "plainaddress",
            "@acme.test",
            "ops@",
            "ops@acme",
            "ops@-acme.test",
            "ops..x@acme.test",
            "ops acme@acme.test",
        ] {
            assert!(!is_email_valid(email), "{email} should be invalid");
        }
    }

    #[test]
    fn test_require_email_normalizes() {
        assert_eq!(
            require_email("companyEmail", Some(" OPS@Acme.test")).unwrap(),
            "ops@acme.test"
        );
    }

    #[test]
    fn test_require_email_names_field() {
        match require_email("companyEmail", None) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "companyEmail"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_optional_email() {
        assert_eq!(optional_email("contactEmail", Some("  ")).unwrap(), None);
        assert!(optional_email("contactEmail", Some("nope")).is_err());
    }
}
