//! Accounts: login, password lifecycle and staff administration

use chrono::{DateTime, Duration, Utc};
use portal_auth::{
    generate_code, generate_temporary_password, hash_password, hash_token,
    validate_password_policy, verify_password, JwtValidator, ResetToken, Role, SessionClaims,
    SESSION_TOKEN_TYPE, STAFF_CODE_PREFIX,
};
use portal_db::{entities::account, unique_violation};
use portal_notify::{templates, EmailMessage};
use rand::{rngs::StdRng, SeedableRng};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::AuthUser,
    models::{CreateStaffRequest, UpdateStaffRequest},
    validation::{clean, normalize_email, require_email},
};

use super::{composed, MAX_CODE_ATTEMPTS};

/// Verified against on unknown-email logins so both failures cost one hash
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$5na0xm2Ay39DGEpBXtA7Jg$U7W/V/fdtW0yd0VMKQRmiwdSuC9oPT8mQV0FBaH/q6A";

/// A freshly issued session
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub account: account::Model,
}

/// Outcome of a forgot-password request for an existing, active account
#[derive(Debug)]
pub struct IssuedReset {
    pub email: String,
    /// Plaintext token; only its digest is stored
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub notification: Option<EmailMessage>,
}

#[derive(Debug)]
pub struct CreatedStaff {
    pub account: account::Model,
    /// Set when the portal generated the initial password
    pub temporary_password: Option<String>,
    pub notification: Option<EmailMessage>,
}

/// Account and credential operations
#[derive(Clone)]
pub struct AccountService {
    db: DatabaseConnection,
    jwt_secret: Vec<u8>,
    session_ttl: Duration,
    reset_token_ttl: Duration,
    portal_url: String,
}

impl AccountService {
    pub fn new(
        db: DatabaseConnection,
        jwt_secret: &[u8],
        session_ttl: Duration,
        reset_token_ttl: Duration,
        portal_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.to_vec(),
            session_ttl,
            reset_token_ttl,
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<account::Model, ApiError> {
        account::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Account"))
    }

    async fn find_by_email(&self, normalized: &str) -> Result<Option<account::Model>, ApiError> {
        Ok(account::Entity::find()
            .filter(account::Column::Email.eq(normalized))
            .one(&self.db)
            .await?)
    }

    async fn code_taken(&self, code: &str) -> Result<bool, ApiError> {
        Ok(account::Entity::find()
            .filter(account::Column::AccountCode.eq(code))
            .one(&self.db)
            .await?
            .is_some())
    }

    /// Authenticate by email and password
    ///
    /// Unknown email and wrong password produce the same error. An inactive
    /// account is refused even when the password is right.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let email = normalize_email(email);

        let Some(account) = self.find_by_email(&email).await? else {
            debug!("Login attempt for unknown email");
            let _ = verify_password(password, DUMMY_PASSWORD_HASH);
            return Err(ApiError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash)? {
            debug!("Login attempt with wrong password for {}", account.id);
            return Err(ApiError::InvalidCredentials);
        }

        if !account.is_active {
            warn!("Login refused for inactive account {}", account.id);
            return Err(ApiError::AccountInactive);
        }

        let role = Role::parse(&account.role).map_err(|e| {
            warn!("Account {} has an unrecognized role: {}", account.id, e);
            ApiError::forbidden("Account role is not recognized")
        })?;

        let now = Utc::now();
        let mut active = account.into_active_model();
        active.last_login_at = Set(Some(now));
        active.role = Set(role.as_str().to_string());
        let account = active.update(&self.db).await?;

        let claims = SessionClaims::new(account.id.to_string(), self.session_ttl)
            .with_email(account.email.clone())
            .with_role(role.as_str().to_string())
            .with_token_type(SESSION_TOKEN_TYPE.to_string())
            .with_must_change_password(account.must_change_password);

        let token = JwtValidator::encode(&self.jwt_secret, &claims)
            .map_err(|e| ApiError::Internal(format!("Failed to sign session token: {}", e)))?;

        info!("Account {} logged in", account.id);

        Ok(Session {
            token,
            expires_at: claims.expires_at(),
            account,
        })
    }

    /// Issue a single-use reset token if an active account owns `email`
    ///
    /// Returns `None` for unknown or inactive accounts; callers must respond
    /// the same way in both cases.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<IssuedReset>, ApiError> {
        let email = normalize_email(email);

        let Some(account) = self.find_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(None);
        };

        if !account.is_active {
            debug!("Password reset requested for inactive account {}", account.id);
            return Ok(None);
        }

        let issued = ResetToken::issue(self.reset_token_ttl);
        let name = account.full_name.clone();

        let mut active = account.into_active_model();
        active.reset_token_hash = Set(Some(issued.token_hash.clone()));
        active.reset_token_expires_at = Set(Some(issued.expires_at));
        active.updated_at = Set(Utc::now());
        let account = active.update(&self.db).await?;

        info!("Issued password reset token for account {}", account.id);

        let reset_url = format!("{}/reset-password/{}", self.portal_url, issued.token);
        let notification = composed(templates::password_reset(
            &account.email,
            name.as_deref(),
            &reset_url,
            issued.expires_at,
        ));

        Ok(Some(IssuedReset {
            email: account.email,
            token: issued.token,
            expires_at: issued.expires_at,
            notification,
        }))
    }

    /// Consume a reset token and set a new password
    ///
    /// The token is cleared in the same statement that stores the new hash,
    /// so of two requests racing with one token only the first succeeds.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Option<EmailMessage>, ApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::TokenInvalid);
        }
        let token_hash = hash_token(token);

        let account = account::Entity::find()
            .filter(account::Column::ResetTokenHash.eq(token_hash.as_str()))
            .one(&self.db)
            .await?
            .ok_or(ApiError::TokenInvalid)?;

        let expired = account
            .reset_token_expires_at
            .map_or(true, |expires_at| expires_at <= Utc::now());

        if expired || !account.is_active {
            debug!("Discarding unusable reset token for account {}", account.id);
            account::Entity::update_many()
                .col_expr(account::Column::ResetTokenHash, Expr::value(Option::<String>::None))
                .col_expr(
                    account::Column::ResetTokenExpiresAt,
                    Expr::value(Option::<DateTime<Utc>>::None),
                )
                .filter(account::Column::Id.eq(account.id))
                .filter(account::Column::ResetTokenHash.eq(token_hash.as_str()))
                .exec(&self.db)
                .await?;
            return Err(ApiError::TokenInvalid);
        }

        validate_password_policy(new_password)
            .map_err(|e| ApiError::weak_password("newPassword", e))?;
        let password_hash = hash_password(new_password)?;

        let consumed = account::Entity::update_many()
            .col_expr(account::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(account::Column::ResetTokenHash, Expr::value(Option::<String>::None))
            .col_expr(
                account::Column::ResetTokenExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(account::Column::MustChangePassword, Expr::value(false))
            .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(account::Column::Id.eq(account.id))
            .filter(account::Column::ResetTokenHash.eq(token_hash.as_str()))
            .exec(&self.db)
            .await?;

        if consumed.rows_affected == 0 {
            debug!("Reset token for account {} was already used", account.id);
            return Err(ApiError::TokenInvalid);
        }

        info!("Password reset completed for account {}", account.id);

        Ok(composed(templates::password_changed(
            &account.email,
            account.full_name.as_deref(),
        )))
    }

    /// Replace the password after re-proving the current one
    ///
    /// Clears the first-login flag and any outstanding reset token.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(account::Model, Option<EmailMessage>), ApiError> {
        let account = self.get(account_id).await?;

        if !verify_password(old_password, &account.password_hash)? {
            debug!("Password change with wrong current password for {}", account.id);
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }

        validate_password_policy(new_password)
            .map_err(|e| ApiError::weak_password("newPassword", e))?;

        if old_password == new_password {
            return Err(ApiError::validation(
                "newPassword",
                "New password must differ from the current password",
            ));
        }

        let password_hash = hash_password(new_password)?;

        let mut active = account.into_active_model();
        active.password_hash = Set(password_hash);
        active.must_change_password = Set(false);
        active.reset_token_hash = Set(None);
        active.reset_token_expires_at = Set(None);
        active.updated_at = Set(Utc::now());
        let account = active.update(&self.db).await?;

        info!("Account {} changed its password", account.id);

        let notification = composed(templates::password_changed(
            &account.email,
            account.full_name.as_deref(),
        ));
        Ok((account, notification))
    }

    /// Create an account on behalf of an administrator
    ///
    /// The account must change its password on first login. Without an
    /// explicit password a compliant temporary one is generated.
    pub async fn create_staff(
        &self,
        actor: &AuthUser,
        request: CreateStaffRequest,
    ) -> Result<CreatedStaff, ApiError> {
        let email = require_email("email", Some(&request.email))?;

        let role = match request.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Role::parse(raw).map_err(|e| ApiError::validation("role", e.to_string()))?,
            None => Role::Staff,
        };
        ensure_can_assign(actor, role)?;

        let (password, temporary_password) = match request.password {
            Some(password) => {
                validate_password_policy(&password)
                    .map_err(|e| ApiError::weak_password("password", e))?;
                (password, None)
            }
            None => {
                let generated = generate_temporary_password();
                (generated.clone(), Some(generated))
            }
        };

        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::duplicate("email", email));
        }

        let password_hash = hash_password(&password)?;
        let full_name = clean(request.full_name);

        let account = self
            .insert_with_code(&email, |code| {
                let now = Utc::now();
                account::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    email: Set(email.clone()),
                    password_hash: Set(password_hash.clone()),
                    full_name: Set(full_name.clone()),
                    phone: Set(clean(request.phone.clone())),
                    avatar_url: Set(None),
                    company_name: Set(clean(request.company_name.clone())),
                    account_code: Set(code),
                    role: Set(role.as_str().to_string()),
                    is_active: Set(true),
                    must_change_password: Set(true),
                    reset_token_hash: Set(None),
                    reset_token_expires_at: Set(None),
                    last_login_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
            })
            .await?;

        info!(
            "Account {} ({}) created by {} with role {}",
            account.account_code, account.email, actor.account_id, role
        );

        let notification = composed(templates::staff_welcome(
            &account.email,
            account.full_name.as_deref(),
            &account.account_code,
            temporary_password.as_deref(),
            &format!("{}/login", self.portal_url),
        ));

        Ok(CreatedStaff {
            account,
            temporary_password,
            notification,
        })
    }

    /// Insert with a fresh `ST-` account code
    ///
    /// Account codes never use the customer-id prefix, so they cannot be
    /// mistaken for an onboarding submission's identifier.
    async fn insert_with_code<F>(
        &self,
        email: &str,
        build: F,
    ) -> Result<account::Model, ApiError>
    where
        F: Fn(String) -> account::ActiveModel,
    {
        let mut rng = StdRng::from_entropy();

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(STAFF_CODE_PREFIX, &mut rng);
            if self.code_taken(&code).await? {
                continue;
            }

            match build(code.clone()).insert(&self.db).await {
                Ok(model) => return Ok(model),
                Err(err) => match unique_violation(&err) {
                    Some(message) if message.contains("account_code") => {
                        warn!("Account code {} collided on insert, drawing again", code);
                        continue;
                    }
                    Some(message) if message.contains("email") => {
                        return Err(ApiError::duplicate("email", email));
                    }
                    _ => return Err(err.into()),
                },
            }
        }

        Err(ApiError::Internal(format!(
            "No free account code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    /// Every non-customer account, newest first
    pub async fn list_staff(&self) -> Result<Vec<account::Model>, ApiError> {
        let accounts = account::Entity::find()
            .order_by_desc(account::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(accounts
            .into_iter()
            .filter(|a| Role::parse(&a.role).map_or(true, |role| role != Role::Customer))
            .collect())
    }

    pub async fn update_staff(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateStaffRequest,
    ) -> Result<account::Model, ApiError> {
        let target = self.get(id).await?;
        ensure_can_manage(actor, &target)?;

        let email = match request.email.as_deref() {
            Some(raw) => Some(require_email("email", Some(raw))?),
            None => None,
        };
        if let Some(email) = &email {
            if *email != target.email && self.find_by_email(email).await?.is_some() {
                return Err(ApiError::duplicate("email", email.clone()));
            }
        }

        let role = match request.role.as_deref() {
            Some(raw) => {
                let role =
                    Role::parse(raw).map_err(|e| ApiError::validation("role", e.to_string()))?;
                ensure_can_assign(actor, role)?;
                if target.id == actor.account_id && !role.is_admin() {
                    return Err(ApiError::validation(
                        "role",
                        "You cannot remove your own admin role",
                    ));
                }
                Some(role)
            }
            None => None,
        };

        let mut active = target.into_active_model();
        if let Some(email) = email.clone() {
            active.email = Set(email);
        }
        if let Some(role) = role {
            active.role = Set(role.as_str().to_string());
        }
        if request.full_name.is_some() {
            active.full_name = Set(clean(request.full_name));
        }
        if request.phone.is_some() {
            active.phone = Set(clean(request.phone));
        }
        if request.company_name.is_some() {
            active.company_name = Set(clean(request.company_name));
        }
        if request.avatar_url.is_some() {
            active.avatar_url = Set(clean(request.avatar_url));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(|err| {
            match (unique_violation(&err), email) {
                (Some(_), Some(email)) => ApiError::duplicate("email", email),
                _ => err.into(),
            }
        })?;

        info!("Account {} updated by {}", updated.id, actor.account_id);
        Ok(updated)
    }

    pub async fn delete_staff(&self, actor: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        if id == actor.account_id {
            return Err(ApiError::validation("id", "You cannot delete your own account"));
        }

        let target = self.get(id).await?;
        ensure_can_manage(actor, &target)?;

        target.delete(&self.db).await?;
        info!("Account {} deleted by {}", id, actor.account_id);

        Ok(())
    }

    /// Flip the active flag
    pub async fn toggle_staff(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<account::Model, ApiError> {
        if id == actor.account_id {
            return Err(ApiError::validation(
                "id",
                "You cannot deactivate your own account",
            ));
        }

        let target = self.get(id).await?;
        ensure_can_manage(actor, &target)?;

        let is_active = !target.is_active;
        let mut active = target.into_active_model();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        info!(
            "Account {} {} by {}",
            updated.id,
            if is_active { "activated" } else { "deactivated" },
            actor.account_id
        );
        Ok(updated)
    }

    /// Create or promote the super-admin used to bootstrap a deployment
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> Result<account::Model, ApiError> {
        let email = require_email("email", Some(email))?;
        validate_password_policy(password).map_err(|e| ApiError::weak_password("password", e))?;
        let password_hash = hash_password(password)?;
        let full_name = clean(full_name);

        if let Some(existing) = self.find_by_email(&email).await? {
            let mut active = existing.into_active_model();
            active.password_hash = Set(password_hash);
            active.role = Set(Role::SuperAdmin.as_str().to_string());
            active.is_active = Set(true);
            active.must_change_password = Set(false);
            if full_name.is_some() {
                active.full_name = Set(full_name);
            }
            active.updated_at = Set(Utc::now());
            let updated = active.update(&self.db).await?;

            info!("Promoted existing account {} to super admin", updated.email);
            return Ok(updated);
        }

        let account = self
            .insert_with_code(&email, |code| {
                let now = Utc::now();
                account::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    email: Set(email.clone()),
                    password_hash: Set(password_hash.clone()),
                    full_name: Set(full_name.clone()),
                    phone: Set(None),
                    avatar_url: Set(None),
                    company_name: Set(None),
                    account_code: Set(code),
                    role: Set(Role::SuperAdmin.as_str().to_string()),
                    is_active: Set(true),
                    must_change_password: Set(false),
                    reset_token_hash: Set(None),
                    reset_token_expires_at: Set(None),
                    last_login_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
            })
            .await?;

        info!("Created super admin {}", account.email);
        Ok(account)
    }
}

/// Only a super admin may hand out the super admin role
fn ensure_can_assign(actor: &AuthUser, role: Role) -> Result<(), ApiError> {
    if role == Role::SuperAdmin && actor.role != Role::SuperAdmin {
        return Err(ApiError::forbidden(
            "Only a super admin can grant the super admin role",
        ));
    }
    Ok(())
}

fn ensure_can_manage(actor: &AuthUser, target: &account::Model) -> Result<(), ApiError> {
    let target_is_super = Role::parse(&target.role).is_ok_and(|role| role == Role::SuperAdmin);
    if target_is_super && actor.role != Role::SuperAdmin {
        return Err(ApiError::forbidden(
            "Only a super admin can manage a super admin account",
        ));
    }
    Ok(())
}
