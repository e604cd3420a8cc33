//! Account entity covering customer, staff and admin credentials

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Account UUID (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login email, trimmed and lowercased (unique)
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub full_name: Option<String>,

    pub phone: Option<String>,

    /// Path under /uploads or an absolute URL
    pub avatar_url: Option<String>,

    /// Company the account belongs to
    pub company_name: Option<String>,

    /// Human-readable identifier (ST-XXXXXXXX), unique
    #[sea_orm(unique)]
    pub account_code: String,

    /// Normalized role string (see portal_auth::Role::as_str)
    pub role: String,

    /// Inactive accounts cannot authenticate
    pub is_active: bool,

    /// Set for admin-created accounts until the first password change
    pub must_change_password: bool,

    /// SHA-256 digest of the outstanding reset token
    pub reset_token_hash: Option<String>,

    pub reset_token_expires_at: Option<ChronoDateTimeUtc>,

    pub last_login_at: Option<ChronoDateTimeUtc>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
