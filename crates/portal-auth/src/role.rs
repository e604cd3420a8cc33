//! Account roles and role-string normalization
//!
//! Role strings arrive from many producers with inconsistent casing and
//! separators ("Super Admin", "super-admin", "SUPER_ADMIN", "SuperAdmin").
//! Every comparison goes through [`normalize_role`] and the closed [`Role`]
//! enumeration; raw strings are never compared directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role string that does not map to any known role
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown role '{0}'")]
pub struct RoleError(pub String);

/// Closed set of account roles, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Bootstrap administrator, may manage other admins
    SuperAdmin,
    /// Administrator: staff management, deletions, admin dashboard
    Admin,
    /// Staff / read-only operator: can view customers and support requests
    Staff,
    /// Customer account
    Customer,
}

impl Role {
    /// Canonical (already normalized) string persisted for this role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }

    /// Parse any producer's spelling of a role
    pub fn parse(raw: &str) -> Result<Self, RoleError> {
        match normalize_role(raw).as_str() {
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            "admin" | "administrator" => Ok(Role::Admin),
            "staff" | "readonly" | "read_only" => Ok(Role::Staff),
            "customer" => Ok(Role::Customer),
            _ => Err(RoleError(raw.to_string())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin => 2,
            Role::Staff => 1,
            Role::Customer => 0,
        }
    }

    /// Whether this role grants at least the privileges of `required`
    pub fn satisfies(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Admin or above
    pub fn is_admin(&self) -> bool {
        self.satisfies(Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s)
    }
}

impl TryFrom<String> for Role {
    type Error = RoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Normalize a role string: trim, split camel-case words, lowercase and
/// collapse runs of spaces, hyphens and underscores into a single `_`.
///
/// ```
/// use portal_auth::normalize_role;
///
/// assert_eq!(normalize_role("Super Admin"), "super_admin");
/// assert_eq!(normalize_role("super-admin"), "super_admin");
/// assert_eq!(normalize_role("SUPER_ADMIN"), "super_admin");
/// assert_eq!(normalize_role("SuperAdmin"), "super_admin");
/// ```
pub fn normalize_role(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len() + 4);
    let mut previous: Option<char> = None;

    for c in raw.trim().chars() {
        if c == '-' || c == '_' || c.is_whitespace() {
            if !normalized.is_empty() && !normalized.ends_with('_') {
                normalized.push('_');
            }
        } else {
            let camel_boundary =
                c.is_uppercase() && previous.is_some_and(|p| p.is_lowercase());
            if camel_boundary && !normalized.ends_with('_') {
                normalized.push('_');
            }
            normalized.extend(c.to_lowercase());
        }
        previous = Some(c);
    }

    while normalized.ends_with('_') {
        normalized.pop();
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_role_variants_agree() {
        let expected = normalize_role("Super Admin");
        assert_eq!(expected, "super_admin");
        assert_eq!(normalize_role("super-admin"), expected);
        assert_eq!(normalize_role("SUPER_ADMIN"), expected);
        assert_eq!(normalize_role("SuperAdmin"), expected);
        assert_eq!(normalize_role("  super -- admin  "), expected);
    }

    #[test]
    fn test_normalize_role_is_idempotent() {
        for raw in ["Super Admin", "read-only", "Admin", "STAFF", "readOnly"] {
            let once = normalize_role(raw);
            assert_eq!(normalize_role(&once), once);
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Role::parse("Super Admin").unwrap(), Role::SuperAdmin);
        assert_eq!(Role::parse("superadmin").unwrap(), Role::SuperAdmin);
        assert_eq!(Role::parse(" ADMIN ").unwrap(), Role::Admin);
        assert_eq!(Role::parse("readonly").unwrap(), Role::Staff);
        assert_eq!(Role::parse("Read-Only").unwrap(), Role::Staff);
        assert_eq!(Role::parse("readOnly").unwrap(), Role::Staff);
        assert_eq!(Role::parse("customer").unwrap(), Role::Customer);
    }

    #[test]
    fn test_parse_unknown_role() {
        assert_eq!(
            Role::parse("owner"),
            Err(RoleError("owner".to_string()))
        );
        assert!(Role::parse("").is_err());
    }

    #[test]
    fn test_admin_requirement_accepts_all_super_admin_spellings() {
        for raw in ["Super Admin", "super-admin", "SUPER_ADMIN"] {
            let role = Role::parse(raw).unwrap();
            assert!(role.satisfies(Role::Admin), "{raw} should satisfy admin");
        }
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.satisfies(Role::Staff));
        assert!(Role::Staff.satisfies(Role::Staff));
        assert!(!Role::Staff.satisfies(Role::Admin));
        assert!(!Role::Customer.satisfies(Role::Staff));
        assert!(Role::Customer.satisfies(Role::Customer));
    }

    #[test]
    fn test_role_serde_uses_canonical_form() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");

        let parsed: Role = serde_json::from_str("\"Super Admin\"").unwrap();
        assert_eq!(parsed, Role::SuperAdmin);

        assert!(serde_json::from_str::<Role>("\"janitor\"").is_err());
    }
}
