use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::engine::{aggregator, escrow, tiers};
use crate::entities::{
    escrow_entry, sponsorship_request, Campaigns, EscrowEntries, PerkTiers, RequestStatus,
    SponsorshipRequests,
};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub campaign_id: Uuid,
    pub sponsor_id: Uuid,
    pub recipient_id: Uuid,
    pub perk_tier_id: Option<Uuid>,
    pub amount: Decimal,
    pub is_custom: bool,
    pub custom_perks: Option<String>,
    pub message: Option<String>,
}

/// An offer paired with its escrow ledger entry.
#[derive(Debug, Clone)]
pub struct OfferWithEscrow {
    pub request: sponsorship_request::Model,
    pub escrow: escrow_entry::Model,
}

/// Which side of an offer the caller is on when listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferRole {
    Sponsor,
    Recipient,
}

#[derive(Debug, Clone, Default)]
pub struct OfferFilter {
    pub status: Option<RequestStatus>,
    pub campaign_id: Option<Uuid>,
}

/// Open a PENDING offer against a campaign and put its funds on hold.
///
/// Tier capacity is deliberately NOT reserved here: a tier may collect more
/// pending offers than it has slots, and the slots go to whichever offers
/// the recipient approves first.
#[tracing::instrument(skip(conn, input), fields(campaign_id = %input.campaign_id, sponsor_id = %input.sponsor_id))]
pub async fn submit_offer<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    input: NewOffer,
) -> Result<OfferWithEscrow, AppError> {
    if input.amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("offer amount must be positive".to_string()));
    }

    let txn = conn.begin().await?;

    let campaign = Campaigns::find_by_id(input.campaign_id)
        .one(&txn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("campaign {} does not exist", input.campaign_id))
        })?;

    // Deadline expiry is evaluated lazily on the submission path.
    let campaign = aggregator::expire_if_due(&txn, campaign).await?;
    if !campaign.status.accepts_offers() {
        return Err(AppError::CampaignNotAcceptingOffers(format!(
            "campaign {} is {:?}",
            campaign.id, campaign.status
        )));
    }
    if input.recipient_id != campaign.owner_id {
        return Err(AppError::InvalidInput(
            "recipient does not own the campaign".to_string(),
        ));
    }

    if let Some(tier_id) = input.perk_tier_id {
        let tier = PerkTiers::find_by_id(tier_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("perk tier {} does not exist", tier_id)))?;
        if tier.campaign_id != campaign.id {
            return Err(AppError::InvalidInput(
                "perk tier belongs to a different campaign".to_string(),
            ));
        }
        if input.amount < tier.amount {
            return Err(AppError::InvalidInput(format!(
                "offer amount {} is below the tier price {}",
                input.amount, tier.amount
            )));
        }
    }

    let now = Utc::now();
    let request = sponsorship_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        campaign_id: Set(campaign.id),
        sponsor_id: Set(input.sponsor_id),
        recipient_id: Set(input.recipient_id),
        perk_tier_id: Set(input.perk_tier_id),
        amount: Set(input.amount),
        is_custom: Set(input.is_custom),
        custom_perks: Set(input.custom_perks),
        message: Set(input.message),
        status: Set(RequestStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let request = request.insert(&txn).await?;
    let entry = escrow::hold(&txn, request.id, request.amount).await?;

    txn.commit().await?;
    tracing::info!(offer_id = %request.id, "offer submitted and funds held");
    Ok(OfferWithEscrow { request, escrow: entry })
}

/// PENDING → ACTIVE, recipient only.
///
/// The whole transition is one transaction: flip the offer status with a
/// conditional UPDATE, reserve the tier slot (if tiered), release escrow,
/// and add the amount to campaign funding. A `CapacityExceeded` or any
/// later failure rolls the entire approval back and the offer stays
/// PENDING; a racing double-approval loses the conditional flip with
/// `InvalidTransition` instead of double-counting.
#[tracing::instrument(skip(conn))]
pub async fn approve_offer<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    offer_id: Uuid,
    acting_profile_id: Uuid,
) -> Result<OfferWithEscrow, AppError> {
    let txn = conn.begin().await?;

    let offer = find_offer(&txn, offer_id).await?;
    let campaign = Campaigns::find_by_id(offer.campaign_id)
        .one(&txn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("campaign {} does not exist", offer.campaign_id))
        })?;

    if acting_profile_id != campaign.owner_id {
        return Err(AppError::Forbidden(
            "only the campaign owner may approve an offer".to_string(),
        ));
    }
    if offer.status != RequestStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "offer {} is {:?}, only PENDING offers can be approved",
            offer_id, offer.status
        )));
    }

    // The conditional flip comes first: it takes the offer row and makes a
    // racing resolution of the same offer lose cleanly. If any step below
    // fails, the transaction rolls the flip back and the offer stays
    // PENDING.
    let flipped = SponsorshipRequests::update_many()
        .col_expr(
            sponsorship_request::Column::Status,
            Expr::value(RequestStatus::Active),
        )
        .col_expr(sponsorship_request::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(sponsorship_request::Column::Id.eq(offer_id))
        .filter(sponsorship_request::Column::Status.eq(RequestStatus::Pending))
        .exec(&txn)
        .await?;
    if flipped.rows_affected == 0 {
        return Err(AppError::InvalidTransition(format!(
            "offer {} was resolved concurrently",
            offer_id
        )));
    }

    if let Some(tier_id) = offer.perk_tier_id {
        tiers::reserve_tier_slot(&txn, tier_id).await?;
    }
    escrow::release(&txn, offer.id).await?;
    aggregator::apply_approval(&txn, campaign.id, offer.amount).await?;

    let resolved = offer_with_escrow(&txn, offer_id).await?;
    txn.commit().await?;
    tracing::info!(offer_id = %offer_id, amount = %resolved.request.amount, "offer approved");
    Ok(resolved)
}

/// PENDING → REJECTED, recipient only. Refunds escrow; no funding or tier
/// state was reserved, so none is touched. Re-rejecting a rejected offer
/// is an idempotent no-op.
#[tracing::instrument(skip(conn))]
pub async fn reject_offer<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    offer_id: Uuid,
    acting_profile_id: Uuid,
) -> Result<OfferWithEscrow, AppError> {
    resolve_pending(
        conn,
        offer_id,
        acting_profile_id,
        OfferRole::Recipient,
        RequestStatus::Rejected,
    )
    .await
}

/// PENDING → CANCELLED, sponsor only, and only while the offer is still
/// PENDING. Re-cancelling a cancelled offer is an idempotent no-op.
#[tracing::instrument(skip(conn))]
pub async fn cancel_offer<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    offer_id: Uuid,
    acting_profile_id: Uuid,
) -> Result<OfferWithEscrow, AppError> {
    resolve_pending(
        conn,
        offer_id,
        acting_profile_id,
        OfferRole::Sponsor,
        RequestStatus::Cancelled,
    )
    .await
}

/// Offers visible to `caller` on the given side, newest first, with their
/// escrow entries.
pub async fn list_offers<C: ConnectionTrait>(
    conn: &C,
    caller_id: Uuid,
    role: OfferRole,
    filter: OfferFilter,
) -> Result<Vec<OfferWithEscrow>, AppError> {
    let mut query = SponsorshipRequests::find()
        .order_by_desc(sponsorship_request::Column::CreatedAt);
    query = match role {
        OfferRole::Sponsor => query.filter(sponsorship_request::Column::SponsorId.eq(caller_id)),
        OfferRole::Recipient => {
            query.filter(sponsorship_request::Column::RecipientId.eq(caller_id))
        }
    };
    if let Some(status) = filter.status {
        query = query.filter(sponsorship_request::Column::Status.eq(status));
    }
    if let Some(campaign_id) = filter.campaign_id {
        query = query.filter(sponsorship_request::Column::CampaignId.eq(campaign_id));
    }
    let requests = query.all(conn).await?;

    let ids: Vec<Uuid> = requests.iter().map(|request| request.id).collect();
    let mut entries: HashMap<Uuid, escrow_entry::Model> = if ids.is_empty() {
        HashMap::new()
    } else {
        EscrowEntries::find()
            .filter(escrow_entry::Column::RequestId.is_in(ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|entry| (entry.request_id, entry))
            .collect()
    };

    requests
        .into_iter()
        .map(|request| {
            let entry = entries.remove(&request.id).ok_or_else(|| {
                AppError::StorageUnavailable(format!("no escrow entry for offer {}", request.id))
            })?;
            Ok(OfferWithEscrow { request, escrow: entry })
        })
        .collect()
}

/// Fetch one offer with its ledger entry.
pub async fn offer_with_escrow<C: ConnectionTrait>(
    conn: &C,
    offer_id: Uuid,
) -> Result<OfferWithEscrow, AppError> {
    let request = find_offer(conn, offer_id).await?;
    let entry = escrow::entry_for(conn, offer_id).await?;
    Ok(OfferWithEscrow { request, escrow: entry })
}

async fn find_offer<C: ConnectionTrait>(
    conn: &C,
    offer_id: Uuid,
) -> Result<sponsorship_request::Model, AppError> {
    SponsorshipRequests::find_by_id(offer_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("offer {} does not exist", offer_id)))
}

// Shared PENDING -> {REJECTED, CANCELLED} path. Both sides refund escrow
// and flip the status conditionally, so a duplicate resolution cannot
// refund twice.
async fn resolve_pending<C: ConnectionTrait + TransactionTrait>(
    conn: &C,
    offer_id: Uuid,
    acting_profile_id: Uuid,
    required_role: OfferRole,
    target: RequestStatus,
) -> Result<OfferWithEscrow, AppError> {
    let txn = conn.begin().await?;

    let offer = find_offer(&txn, offer_id).await?;
    let authorized = match required_role {
        OfferRole::Sponsor => offer.sponsor_id == acting_profile_id,
        OfferRole::Recipient => offer.recipient_id == acting_profile_id,
    };
    if !authorized {
        let side = match required_role {
            OfferRole::Sponsor => "sponsor",
            OfferRole::Recipient => "recipient",
        };
        return Err(AppError::Forbidden(format!(
            "only the offer's {} may perform this transition",
            side
        )));
    }

    if offer.status == target {
        // Repeat of an already-applied resolution: return the terminal
        // state, no second refund.
        let resolved = offer_with_escrow(&txn, offer_id).await?;
        txn.commit().await?;
        return Ok(resolved);
    }
    if offer.status != RequestStatus::Pending {
        return Err(AppError::InvalidTransition(format!(
            "offer {} is {:?}, cannot move to {:?}",
            offer_id, offer.status, target
        )));
    }

    let flipped = SponsorshipRequests::update_many()
        .col_expr(sponsorship_request::Column::Status, Expr::value(target))
        .col_expr(sponsorship_request::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(sponsorship_request::Column::Id.eq(offer_id))
        .filter(sponsorship_request::Column::Status.eq(RequestStatus::Pending))
        .exec(&txn)
        .await?;
    if flipped.rows_affected == 0 {
        return Err(AppError::InvalidTransition(format!(
            "offer {} was resolved concurrently",
            offer_id
        )));
    }

    escrow::refund(&txn, offer_id).await?;

    let resolved = offer_with_escrow(&txn, offer_id).await?;
    txn.commit().await?;
    tracing::info!(offer_id = %offer_id, status = ?target, "offer resolved and refunded");
    Ok(resolved)
}
