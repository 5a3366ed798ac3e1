use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A registered identity: campaign owners (athlete/team/event) and sponsors.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub display_name: String,
    pub profile_type: ProfileType,
    // Bearer credential resolved by the identity extractor; never serialized
    // back out except at registration time.
    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub api_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProfileType {
    #[sea_orm(string_value = "ATHLETE")]
    Athlete,
    #[sea_orm(string_value = "TEAM")]
    Team,
    #[sea_orm(string_value = "EVENT")]
    Event,
    #[sea_orm(string_value = "SPONSOR")]
    Sponsor,
}

impl ProfileType {
    /// Only these profile types may publish campaigns.
    pub fn can_own_campaigns(self) -> bool {
        !matches!(self, ProfileType::Sponsor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
