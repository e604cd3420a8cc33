//! Support and upgrade requests mirrored to the external issue tracker

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "support_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// "support" or "upgrade"
    pub kind: String,

    /// Account that filed the request (kept after the account is deleted)
    pub reporter_id: Uuid,
    pub reporter_name: Option<String>,
    pub reporter_email: String,

    /// Onboarding customer identifier the request concerns, if any
    pub customer_id: Option<String>,

    pub subject: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub priority: String,
    pub category: String,

    /// Reference to an uploaded attachment (path under /uploads)
    pub attachment: Option<String>,

    /// External tracker reference; NULL when mirroring failed
    pub tracker_key: Option<String>,
    pub tracker_id: Option<String>,
    pub tracker_url: Option<String>,

    /// Last status string seen from the tracker
    pub tracker_status: Option<String>,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
