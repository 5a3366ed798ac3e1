use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    campaign, escrow_entry, sponsorship_request, CampaignStatus, Campaigns, EscrowEntries,
    EscrowStatus, RequestStatus, SponsorshipRequests,
};
use crate::error::AppError;

/// Fold one approved offer into the campaign: add its amount to
/// `current_funding` and flip OPEN to ACTIVE on the first approval. Runs
/// inside the approval transaction; the funding increment is an in-database
/// add, never a read-modify-write.
pub async fn apply_approval<C: ConnectionTrait>(
    conn: &C,
    campaign_id: Uuid,
    amount: Decimal,
) -> Result<(), AppError> {
    Campaigns::update_many()
        .col_expr(
            campaign::Column::CurrentFunding,
            Expr::col(campaign::Column::CurrentFunding).add(amount),
        )
        .col_expr(campaign::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(campaign::Column::Id.eq(campaign_id))
        .exec(conn)
        .await?;

    // First approved offer moves the campaign out of OPEN.
    Campaigns::update_many()
        .col_expr(campaign::Column::Status, Expr::value(CampaignStatus::Active))
        .filter(campaign::Column::Id.eq(campaign_id))
        .filter(campaign::Column::Status.eq(CampaignStatus::Open))
        .exec(conn)
        .await?;

    Ok(())
}

/// Lazy deadline check: an OPEN/ACTIVE campaign past its deadline while
/// still below goal becomes EXPIRED. A goal-met campaign stays ACTIVE past
/// the deadline awaiting owner confirmation. Expiry never touches offers:
/// already-PENDING ones remain approvable, it only blocks new submissions.
pub async fn expire_if_due<C: ConnectionTrait>(
    conn: &C,
    record: campaign::Model,
) -> Result<campaign::Model, AppError> {
    if !record.status.accepts_offers()
        || record.deadline > Utc::now()
        || record.current_funding >= record.goal_amount
    {
        return Ok(record);
    }

    tracing::info!(campaign_id = %record.id, "campaign deadline passed below goal, expiring");
    let mut active: campaign::ActiveModel = record.into();
    active.status = Set(CampaignStatus::Expired);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Defensive recomputation: re-derive `current_funding` from the ACTIVE
/// offer set and re-resolve the campaign status. The incremental updates in
/// the state machine keep these current in normal operation; this is the
/// reconciliation path for drift repair.
#[tracing::instrument(skip(conn))]
pub async fn recompute_campaign_status<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    campaign_id: Uuid,
) -> Result<campaign::Model, AppError> {
    let txn = conn.begin().await?;

    let record = Campaigns::find_by_id(campaign_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {} does not exist", campaign_id)))?;

    let active_offers = SponsorshipRequests::find()
        .filter(sponsorship_request::Column::CampaignId.eq(campaign_id))
        .filter(sponsorship_request::Column::Status.eq(RequestStatus::Active))
        .all(&txn)
        .await?;
    let total: Decimal = active_offers.iter().map(|offer| offer.amount).sum();

    if total != record.current_funding {
        tracing::warn!(
            campaign_id = %record.id,
            stored = %record.current_funding,
            derived = %total,
            "current_funding drifted from ACTIVE offer sum, repairing"
        );
    }

    let mut status = record.status;
    if status == CampaignStatus::Open && !active_offers.is_empty() {
        status = CampaignStatus::Active;
    }
    if status.accepts_offers() && Utc::now() > record.deadline && total < record.goal_amount {
        status = CampaignStatus::Expired;
    }

    let record = if total != record.current_funding || status != record.status {
        let mut active: campaign::ActiveModel = record.into();
        active.current_funding = Set(total);
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?
    } else {
        record
    };

    txn.commit().await?;
    Ok(record)
}

/// Owner confirmation that the campaign is done. Not automatic on reaching
/// the goal, since perk tiers may still be fulfilled; requires
/// `current_funding >= goal_amount`.
#[tracing::instrument(skip(conn))]
pub async fn confirm_completed<C: ConnectionTrait>(
    conn: &C,
    campaign_id: Uuid,
    acting_profile_id: Uuid,
) -> Result<campaign::Model, AppError> {
    let record = Campaigns::find_by_id(campaign_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {} does not exist", campaign_id)))?;

    if record.owner_id != acting_profile_id {
        return Err(AppError::Forbidden(
            "only the campaign owner may confirm completion".to_string(),
        ));
    }
    if record.status == CampaignStatus::Completed {
        return Ok(record);
    }
    if !record.status.accepts_offers() {
        return Err(AppError::InvalidTransition(format!(
            "campaign {} is {:?} and cannot be completed",
            campaign_id, record.status
        )));
    }
    if record.current_funding < record.goal_amount {
        return Err(AppError::InvalidTransition(format!(
            "campaign {} is below goal ({} of {})",
            campaign_id, record.current_funding, record.goal_amount
        )));
    }

    let mut active: campaign::ActiveModel = record.into();
    active.status = Set(CampaignStatus::Completed);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Owner cancellation. Forces every still-PENDING offer on the campaign to
/// REJECTED with its escrow REFUNDED, all inside one transaction. Approved
/// (ACTIVE) offers are settled history and stay untouched.
#[tracing::instrument(skip(conn))]
pub async fn cancel_campaign<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    campaign_id: Uuid,
    acting_profile_id: Uuid,
) -> Result<campaign::Model, AppError> {
    let txn = conn.begin().await?;

    let record = Campaigns::find_by_id(campaign_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {} does not exist", campaign_id)))?;

    if record.owner_id != acting_profile_id {
        return Err(AppError::Forbidden(
            "only the campaign owner may cancel the campaign".to_string(),
        ));
    }
    if record.status == CampaignStatus::Cancelled {
        txn.commit().await?;
        return Ok(record);
    }
    if record.status == CampaignStatus::Completed {
        return Err(AppError::InvalidTransition(
            "a completed campaign cannot be cancelled".to_string(),
        ));
    }

    let pending: Vec<Uuid> = SponsorshipRequests::find()
        .filter(sponsorship_request::Column::CampaignId.eq(campaign_id))
        .filter(sponsorship_request::Column::Status.eq(RequestStatus::Pending))
        .all(&txn)
        .await?
        .into_iter()
        .map(|offer| offer.id)
        .collect();

    if !pending.is_empty() {
        let now = Utc::now();
        SponsorshipRequests::update_many()
            .col_expr(
                sponsorship_request::Column::Status,
                Expr::value(RequestStatus::Rejected),
            )
            .col_expr(sponsorship_request::Column::UpdatedAt, Expr::value(now))
            .filter(sponsorship_request::Column::Id.is_in(pending.clone()))
            .filter(sponsorship_request::Column::Status.eq(RequestStatus::Pending))
            .exec(&txn)
            .await?;

        EscrowEntries::update_many()
            .col_expr(escrow_entry::Column::Status, Expr::value(EscrowStatus::Refunded))
            .col_expr(escrow_entry::Column::UpdatedAt, Expr::value(now))
            .filter(escrow_entry::Column::RequestId.is_in(pending.clone()))
            .filter(escrow_entry::Column::Status.eq(EscrowStatus::Held))
            .exec(&txn)
            .await?;

        tracing::info!(
            campaign_id = %campaign_id,
            refunded_offers = pending.len(),
            "campaign cancelled, pending offers rejected and refunded"
        );
    }

    let mut active: campaign::ActiveModel = record.into();
    active.status = Set(CampaignStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    let record = active.update(&txn).await?;

    txn.commit().await?;
    Ok(record)
}
