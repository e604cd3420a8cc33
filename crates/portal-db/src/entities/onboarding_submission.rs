//! Onboarding submission captured by the signup wizard

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "onboarding_submissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Generated identifier (CS-XXXXXXXX), unique
    #[sea_orm(unique)]
    pub customer_id: String,

    pub company_name: String,

    /// Normalized company email (unique)
    #[sea_orm(unique)]
    pub company_email: String,

    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,

    pub secondary_contact_name: Option<String>,
    pub secondary_contact_phone: Option<String>,
    pub secondary_contact_email: Option<String>,

    /// Requested number of AWS accounts
    pub number_of_accounts: i32,

    /// JSON object mapping alias keys (A, B, ...) to department names
    #[sea_orm(column_type = "Text")]
    pub aliases: String,

    /// Free-text aliases beyond the keyed map
    #[sea_orm(column_type = "Text", nullable)]
    pub other_aliases: Option<String>,

    pub agree: bool,
    pub acknowledge: bool,
    pub confirm: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
