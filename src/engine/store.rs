use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{campaign, perk_tier, profile, CampaignStatus, Campaigns, PerkTiers, ProfileType};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub goal_amount: Decimal,
    pub deadline: DateTime<Utc>,
    pub tiers: Vec<NewPerkTier>,
}

#[derive(Debug, Clone)]
pub struct NewPerkTier {
    pub name: String,
    pub description: String,
    pub amount: Decimal,
    pub max_sponsors: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub owner_id: Option<Uuid>,
    pub owner_type: Option<ProfileType>,
    pub status: Option<CampaignStatus>,
}

/// Create a campaign and its perk tiers as one unit.
///
/// A campaign may be created with zero tiers: custom, untiered offers are
/// always legal, so an empty tier set is not an error.
#[tracing::instrument(skip(conn, owner, input), fields(owner_id = %owner.id))]
pub async fn create_campaign<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    owner: &profile::Model,
    input: NewCampaign,
) -> Result<(campaign::Model, Vec<perk_tier::Model>), AppError> {
    if !owner.profile_type.can_own_campaigns() {
        return Err(AppError::Forbidden(
            "sponsor profiles cannot publish campaigns".to_string(),
        ));
    }
    if input.goal_amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("goal_amount must be positive".to_string()));
    }
    if input.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }
    let now = Utc::now();
    if input.deadline <= now {
        return Err(AppError::InvalidInput("deadline must be in the future".to_string()));
    }
    for tier in &input.tiers {
        if tier.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(format!(
                "tier '{}' amount must be positive",
                tier.name
            )));
        }
        if matches!(tier.max_sponsors, Some(max) if max < 0) {
            return Err(AppError::InvalidInput(format!(
                "tier '{}' max_sponsors must not be negative",
                tier.name
            )));
        }
    }

    let txn = conn.begin().await?;

    let record = campaign::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner.id),
        owner_type: Set(owner.profile_type),
        title: Set(input.title),
        description: Set(input.description),
        goal_amount: Set(input.goal_amount),
        current_funding: Set(Decimal::ZERO),
        deadline: Set(input.deadline),
        status: Set(CampaignStatus::Open),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let record = record.insert(&txn).await?;

    let mut tiers = Vec::with_capacity(input.tiers.len());
    for tier in input.tiers {
        let tier = perk_tier::ActiveModel {
            id: Set(Uuid::new_v4()),
            campaign_id: Set(record.id),
            name: Set(tier.name),
            description: Set(tier.description),
            amount: Set(tier.amount),
            max_sponsors: Set(tier.max_sponsors),
            current_sponsors: Set(0),
            created_at: Set(now),
        };
        tiers.push(tier.insert(&txn).await?);
    }

    txn.commit().await?;

    tracing::info!(campaign_id = %record.id, tiers = tiers.len(), "campaign created");
    tiers.sort_by(|a, b| a.amount.cmp(&b.amount));
    Ok((record, tiers))
}

/// Fetch a campaign with its tiers, tiers sorted ascending by amount.
pub async fn get_campaign<C: ConnectionTrait>(
    conn: &C,
    campaign_id: Uuid,
) -> Result<(campaign::Model, Vec<perk_tier::Model>), AppError> {
    let record = Campaigns::find_by_id(campaign_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {} does not exist", campaign_id)))?;

    let tiers = PerkTiers::find()
        .filter(perk_tier::Column::CampaignId.eq(campaign_id))
        .order_by_asc(perk_tier::Column::Amount)
        .all(conn)
        .await?;

    Ok((record, tiers))
}

/// Snapshot listing with optional owner/type/status filters; no locking.
pub async fn list_campaigns<C: ConnectionTrait>(
    conn: &C,
    filter: CampaignFilter,
) -> Result<Vec<campaign::Model>, AppError> {
    let mut query = Campaigns::find().order_by_desc(campaign::Column::CreatedAt);
    if let Some(owner_id) = filter.owner_id {
        query = query.filter(campaign::Column::OwnerId.eq(owner_id));
    }
    if let Some(owner_type) = filter.owner_type {
        query = query.filter(campaign::Column::OwnerType.eq(owner_type));
    }
    if let Some(status) = filter.status {
        query = query.filter(campaign::Column::Status.eq(status));
    }
    Ok(query.all(conn).await?)
}
