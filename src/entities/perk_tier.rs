use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A priced sponsorship package attached to a campaign.
///
/// `max_sponsors = NULL` means unlimited capacity. `current_sponsors` counts
/// approved (ACTIVE) offers only and is bounded by `max_sponsors`; both are
/// written exclusively through the tier allocator's guarded updates.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "perk_tiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub description: String,
    pub amount: Decimal,
    pub max_sponsors: Option<i32>,
    pub current_sponsors: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
