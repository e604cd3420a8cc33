//! Onboarding intake: validate, persist, then compose notifications

use std::collections::BTreeMap;

use chrono::Utc;
use portal_auth::{generate_code, CUSTOMER_ID_PREFIX};
use portal_db::{entities::onboarding_submission, unique_violation};
use portal_notify::{templates, EmailMessage};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{OnboardingRequest, UpdateContactRequest},
    validation::{clean, normalize_email, optional_email, require_email},
};

use super::{composed, MAX_CODE_ATTEMPTS};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Result of an accepted submission
#[derive(Debug)]
pub struct IntakeOutcome {
    pub submission: onboarding_submission::Model,
    /// Confirmation to the submitter and the internal copy, in that order
    pub notifications: Vec<EmailMessage>,
}

/// Submission after structural checks and normalization
#[derive(Debug)]
struct ValidSubmission {
    company_name: String,
    company_email: String,
    contact_name: Option<String>,
    contact_phone: Option<String>,
    contact_email: Option<String>,
    secondary_contact_name: Option<String>,
    secondary_contact_phone: Option<String>,
    secondary_contact_email: Option<String>,
    number_of_accounts: i32,
    aliases: BTreeMap<String, String>,
    other_aliases: Option<String>,
}

fn validate(payload: OnboardingRequest) -> Result<ValidSubmission, ApiError> {
    let (company, aws) = match (payload.company_info, payload.aws_setup) {
        (Some(company), Some(aws)) => (company, aws),
        (company, aws) => {
            let mut missing = Vec::new();
            if company.is_none() {
                missing.push("companyInfo".to_string());
            }
            if aws.is_none() {
                missing.push("awsSetup".to_string());
            }
            return Err(ApiError::MissingRequiredFields(missing));
        }
    };

    let company_name = clean(company.company_name)
        .ok_or_else(|| ApiError::validation("companyName", "Company name is required"))?;
    let company_email = require_email("companyEmail", company.company_email.as_deref())?;
    let contact_email = optional_email("contactEmail", company.contact_email.as_deref())?;
    let secondary_contact_email = optional_email(
        "secondaryContactEmail",
        company.secondary_contact_email.as_deref(),
    )?;

    if aws.number_of_accounts < 0 {
        return Err(ApiError::validation(
            "numberOfAccounts",
            "Number of accounts cannot be negative",
        ));
    }

    let mut aliases = BTreeMap::new();
    for (key, name) in aws.aliases {
        let key = key.trim().to_uppercase();
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        if key.is_empty() {
            return Err(ApiError::validation("aliases", "Alias keys cannot be empty"));
        }
        aliases.insert(key, name);
    }

    if !payload.agreements.all_accepted() {
        return Err(ApiError::validation(
            "agreements",
            "All three agreements must be accepted",
        ));
    }

    Ok(ValidSubmission {
        company_name,
        company_email,
        contact_name: clean(company.contact_name),
        contact_phone: clean(company.contact_phone),
        contact_email,
        secondary_contact_name: clean(company.secondary_contact_name),
        secondary_contact_phone: clean(company.secondary_contact_phone),
        secondary_contact_email,
        number_of_accounts: aws.number_of_accounts,
        aliases,
        other_aliases: clean(aws.other_aliases),
    })
}

/// Onboarding submissions
#[derive(Clone)]
pub struct IntakeService {
    db: DatabaseConnection,
    ops_email: String,
}

impl IntakeService {
    pub fn new(db: DatabaseConnection, ops_email: impl Into<String>) -> Self {
        Self {
            db,
            ops_email: ops_email.into(),
        }
    }

    /// Accept a wizard submission
    ///
    /// The company email is normalized and checked for duplicates before the
    /// insert; the unique index on the table remains the final arbiter when
    /// two submissions race. A generated customer id that collides with an
    /// existing one is re-drawn.
    pub async fn submit(&self, payload: OnboardingRequest) -> Result<IntakeOutcome, ApiError> {
        let mut rng = StdRng::from_entropy();
        self.submit_with_rng(payload, &mut rng).await
    }

    /// [`submit`](Self::submit) with a caller-supplied identifier source
    pub async fn submit_with_rng<R: Rng + Send>(
        &self,
        payload: OnboardingRequest,
        rng: &mut R,
    ) -> Result<IntakeOutcome, ApiError> {
        let valid = validate(payload)?;

        if self.lookup_email(&valid.company_email).await?.is_some() {
            debug!("Duplicate onboarding for {}", valid.company_email);
            return Err(ApiError::duplicate("companyEmail", valid.company_email));
        }

        self.store(valid, rng).await
    }

    /// Insert under a fresh customer id
    ///
    /// The unique index on `company_email` rejects a submission that won a
    /// race past the duplicate pre-check.
    async fn store<R: Rng + Send>(
        &self,
        valid: ValidSubmission,
        rng: &mut R,
    ) -> Result<IntakeOutcome, ApiError> {
        let aliases_json = serde_json::to_string(&valid.aliases)
            .map_err(|e| ApiError::Internal(format!("Failed to encode aliases: {}", e)))?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let customer_id = generate_code(CUSTOMER_ID_PREFIX, rng);

            if self.lookup_customer_id(&customer_id).await?.is_some() {
                debug!("Customer id {} already taken, drawing again", customer_id);
                continue;
            }

            let now = Utc::now();
            let submission = onboarding_submission::ActiveModel {
                id: Set(Uuid::new_v4()),
                customer_id: Set(customer_id.clone()),
                company_name: Set(valid.company_name.clone()),
                company_email: Set(valid.company_email.clone()),
                contact_name: Set(valid.contact_name.clone()),
                contact_phone: Set(valid.contact_phone.clone()),
                contact_email: Set(valid.contact_email.clone()),
                secondary_contact_name: Set(valid.secondary_contact_name.clone()),
                secondary_contact_phone: Set(valid.secondary_contact_phone.clone()),
                secondary_contact_email: Set(valid.secondary_contact_email.clone()),
                number_of_accounts: Set(valid.number_of_accounts),
                aliases: Set(aliases_json.clone()),
                other_aliases: Set(valid.other_aliases.clone()),
                agree: Set(true),
                acknowledge: Set(true),
                confirm: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            };

            match submission.insert(&self.db).await {
                Ok(model) => {
                    info!(
                        "Onboarding accepted: {} ({})",
                        model.customer_id, model.company_email
                    );
                    let notifications = self.compose_notifications(&model, &valid.aliases);
                    return Ok(IntakeOutcome {
                        submission: model,
                        notifications,
                    });
                }
                Err(err) => match unique_violation(&err) {
                    Some(message) if message.contains("company_email") => {
                        return Err(ApiError::duplicate("companyEmail", valid.company_email));
                    }
                    Some(message) if message.contains("customer_id") => {
                        warn!("Customer id {} collided on insert, drawing again", customer_id);
                        continue;
                    }
                    _ => return Err(err.into()),
                },
            }
        }

        Err(ApiError::Internal(format!(
            "No free customer id after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    fn compose_notifications(
        &self,
        model: &onboarding_submission::Model,
        aliases: &BTreeMap<String, String>,
    ) -> Vec<EmailMessage> {
        let recap = templates::OnboardingRecap {
            customer_id: model.customer_id.clone(),
            company_name: model.company_name.clone(),
            company_email: model.company_email.clone(),
            contact_name: model.contact_name.clone(),
            contact_phone: model.contact_phone.clone(),
            contact_email: model.contact_email.clone(),
            secondary_contact_name: model.secondary_contact_name.clone(),
            secondary_contact_phone: model.secondary_contact_phone.clone(),
            secondary_contact_email: model.secondary_contact_email.clone(),
            number_of_accounts: model.number_of_accounts,
            aliases: aliases
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            other_aliases: model.other_aliases.clone(),
            agree: model.agree,
            acknowledge: model.acknowledge,
            confirm: model.confirm,
            submitted_at: model.created_at,
        };

        [
            templates::onboarding_confirmation(&recap),
            templates::onboarding_internal(&recap, &self.ops_email),
        ]
        .into_iter()
        .filter_map(composed)
        .collect()
    }

    async fn lookup_email(
        &self,
        normalized: &str,
    ) -> Result<Option<onboarding_submission::Model>, ApiError> {
        Ok(onboarding_submission::Entity::find()
            .filter(onboarding_submission::Column::CompanyEmail.eq(normalized))
            .one(&self.db)
            .await?)
    }

    async fn lookup_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<onboarding_submission::Model>, ApiError> {
        Ok(onboarding_submission::Entity::find()
            .filter(onboarding_submission::Column::CustomerId.eq(customer_id))
            .one(&self.db)
            .await?)
    }

    /// Case-insensitive lookup by company email
    pub async fn find_by_company_email(
        &self,
        email: &str,
    ) -> Result<onboarding_submission::Model, ApiError> {
        self.lookup_email(&normalize_email(email))
            .await?
            .ok_or_else(|| ApiError::not_found("Onboarding submission"))
    }

    pub async fn get(&self, customer_id: &str) -> Result<onboarding_submission::Model, ApiError> {
        self.lookup_customer_id(customer_id.trim())
            .await?
            .ok_or_else(|| ApiError::not_found("Onboarding submission"))
    }

    /// Newest first; `page` is 1-based
    pub async fn list(
        &self,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<(Vec<onboarding_submission::Model>, u64, u64, u64), ApiError> {
        let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = page.unwrap_or(1).max(1);

        let paginator = onboarding_submission::Entity::find()
            .order_by_desc(onboarding_submission::Column::CreatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let submissions = paginator.fetch_page(page - 1).await?;

        Ok((submissions, total, page, per_page))
    }

    /// Update the primary contact; every other field is fixed after intake
    pub async fn update_contact(
        &self,
        customer_id: &str,
        update: UpdateContactRequest,
    ) -> Result<onboarding_submission::Model, ApiError> {
        let existing = self.get(customer_id).await?;
        let contact_email = optional_email("contactEmail", update.contact_email.as_deref())?;

        let mut active = existing.into_active_model();
        if update.contact_name.is_some() {
            active.contact_name = Set(clean(update.contact_name));
        }
        if update.contact_phone.is_some() {
            active.contact_phone = Set(clean(update.contact_phone));
        }
        if update.contact_email.is_some() {
            active.contact_email = Set(contact_email);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        info!("Updated contact for {}", updated.customer_id);

        Ok(updated)
    }

    pub async fn delete(&self, customer_id: &str) -> Result<(), ApiError> {
        let result = onboarding_submission::Entity::delete_many()
            .filter(onboarding_submission::Column::CustomerId.eq(customer_id.trim()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ApiError::not_found("Onboarding submission"));
        }

        info!("Deleted onboarding submission {}", customer_id);
        Ok(())
    }
}
