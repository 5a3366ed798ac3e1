use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{campaign, profile, Campaigns, Profiles, ProfileType};
use crate::error::AppError;

/// Does a profile with this id and type exist?
pub async fn profile_exists<C: ConnectionTrait>(
    conn: &C,
    profile_id: Uuid,
    profile_type: ProfileType,
) -> Result<bool, AppError> {
    let count = Profiles::find()
        .filter(profile::Column::Id.eq(profile_id))
        .filter(profile::Column::ProfileType.eq(profile_type))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Resolve an offer recipient: the profile must exist and be of a type that
/// can own campaigns (athlete, team, or event).
pub async fn recipient_profile<C: ConnectionTrait>(
    conn: &C,
    profile_id: Uuid,
) -> Result<profile::Model, AppError> {
    let found = Profiles::find_by_id(profile_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile {} does not exist", profile_id)))?;
    if !found.profile_type.can_own_campaigns() {
        return Err(AppError::InvalidInput(format!(
            "profile {} cannot receive sponsorships",
            profile_id
        )));
    }
    Ok(found)
}

/// Owning profile of a campaign.
pub async fn owner_of<C: ConnectionTrait>(conn: &C, campaign_id: Uuid) -> Result<Uuid, AppError> {
    Campaigns::find_by_id(campaign_id)
        .one(conn)
        .await?
        .map(|record: campaign::Model| record.owner_id)
        .ok_or_else(|| AppError::NotFound(format!("campaign {} does not exist", campaign_id)))
}
