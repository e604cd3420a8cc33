//! Authentication and authorization primitives for the onboarding portal

pub mod code;
pub mod jwt;
pub mod password;
pub mod reset_token;
pub mod role;

pub use code::{generate_code, is_valid_code, CUSTOMER_ID_PREFIX, STAFF_CODE_PREFIX};
pub use jwt::{JwtError, JwtValidator, SessionClaims, SESSION_TOKEN_TYPE};
pub use password::{
    generate_temporary_password, hash_password, validate_password_policy, verify_password,
    PasswordError, PasswordPolicyError,
};
pub use reset_token::{hash_token, ResetToken};
pub use role::{normalize_role, Role, RoleError};
