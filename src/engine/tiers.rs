use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{perk_tier, PerkTiers};
use crate::error::AppError;

/// Reserve one slot on a perk tier.
///
/// The increment is a single conditional UPDATE guarded by
/// `current_sponsors < max_sponsors`, checked through the affected-row
/// count. Two racing reservations against a tier with one open slot get
/// exactly one success and one `CapacityExceeded`; there is no
/// read-then-write window. Unlimited tiers (`max_sponsors` NULL) always
/// succeed.
#[tracing::instrument(skip(conn))]
pub async fn reserve_tier_slot<C: ConnectionTrait>(
    conn: &C,
    tier_id: Uuid,
) -> Result<perk_tier::Model, AppError> {
    let result = PerkTiers::update_many()
        .col_expr(
            perk_tier::Column::CurrentSponsors,
            Expr::col(perk_tier::Column::CurrentSponsors).add(1),
        )
        .filter(perk_tier::Column::Id.eq(tier_id))
        .filter(
            Condition::any()
                .add(perk_tier::Column::MaxSponsors.is_null())
                .add(
                    Expr::col(perk_tier::Column::CurrentSponsors)
                        .lt(Expr::col(perk_tier::Column::MaxSponsors)),
                ),
        )
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        // Either the tier is gone or it is full; look to tell the two apart.
        return match PerkTiers::find_by_id(tier_id).one(conn).await? {
            Some(tier) => {
                // Expected under concurrent approvals, not an error condition.
                tracing::debug!(
                    current_sponsors = tier.current_sponsors,
                    max_sponsors = ?tier.max_sponsors,
                    "tier full at reservation time"
                );
                Err(AppError::CapacityExceeded(format!(
                    "perk tier {} has no open sponsor slots",
                    tier_id
                )))
            }
            None => Err(AppError::NotFound(format!("perk tier {} does not exist", tier_id))),
        };
    }

    PerkTiers::find_by_id(tier_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("perk tier {} does not exist", tier_id)))
}

/// Give a previously reserved slot back, e.g. from the reconciliation path
/// when an approved offer count drifted. Guarded so `current_sponsors`
/// never goes below zero; releasing an already-empty tier is a no-op.
#[tracing::instrument(skip(conn))]
pub async fn release_tier_slot<C: ConnectionTrait>(
    conn: &C,
    tier_id: Uuid,
) -> Result<perk_tier::Model, AppError> {
    PerkTiers::update_many()
        .col_expr(
            perk_tier::Column::CurrentSponsors,
            Expr::col(perk_tier::Column::CurrentSponsors).sub(1),
        )
        .filter(perk_tier::Column::Id.eq(tier_id))
        .filter(perk_tier::Column::CurrentSponsors.gt(0))
        .exec(conn)
        .await?;

    PerkTiers::find_by_id(tier_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("perk tier {} does not exist", tier_id)))
}
