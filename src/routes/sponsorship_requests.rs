use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthenticatedProfile;
use crate::directory;
use crate::engine::offers::{self, OfferFilter, OfferRole, OfferWithEscrow};
use crate::entities::{EscrowStatus, ProfileType, RequestStatus};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOfferRequest {
    /// Campaign the offer is made against
    pub campaign_id: Uuid,
    /// Recipient profile (the campaign owner: athlete, team, or event)
    pub athlete_id: Uuid,
    /// Perk tier the offer targets; omit for a custom offer
    #[serde(default)]
    pub perk_tier_id: Option<Uuid>,
    /// Contribution amount; at least the tier price when a tier is given
    pub amount: Decimal,
    /// Free-text perks proposed by the sponsor for custom offers
    #[serde(default)]
    pub custom_perks: Option<String>,
    /// Message to the recipient
    #[serde(default)]
    pub message: Option<String>,
    /// True when the sponsor proposes terms outside any tier
    pub is_custom: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOfferRequest {
    /// Offer to transition
    pub id: Uuid,
    /// Target status: ACTIVE (approve, recipient), REJECTED (recipient),
    /// or CANCELLED (sponsor, while PENDING)
    pub status: RequestStatus,
    /// Accepted for compatibility; escrow state is derived server-side
    /// and this value is ignored
    #[serde(default)]
    pub escrow_status: Option<EscrowStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfferResponse {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub sponsor_id: Uuid,
    pub recipient_id: Uuid,
    pub perk_tier_id: Option<Uuid>,
    pub amount: Decimal,
    pub is_custom: bool,
    pub custom_perks: Option<String>,
    pub message: Option<String>,
    pub status: RequestStatus,
    /// HELD while PENDING, RELEASED when ACTIVE, REFUNDED when
    /// REJECTED/CANCELLED
    pub escrow_status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OfferWithEscrow> for OfferResponse {
    fn from(resolved: OfferWithEscrow) -> Self {
        let request = resolved.request;
        OfferResponse {
            id: request.id,
            campaign_id: request.campaign_id,
            sponsor_id: request.sponsor_id,
            recipient_id: request.recipient_id,
            perk_tier_id: request.perk_tier_id,
            amount: request.amount,
            is_custom: request.is_custom,
            custom_perks: request.custom_perks,
            message: request.message,
            status: request.status,
            escrow_status: resolved.escrow.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Which side of the offers the caller wants to see.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OfferRoleParam {
    Sponsor,
    /// The recipient side (athlete, team, or event)
    Athlete,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOffersQuery {
    /// sponsor: offers the caller submitted; athlete: offers addressed to
    /// the caller
    pub role: OfferRoleParam,
    /// Filter by offer status
    #[serde(default)]
    #[param(required = false)]
    pub status: Option<RequestStatus>,
    /// Filter by campaign
    #[serde(default)]
    #[param(required = false)]
    pub campaign_id: Option<Uuid>,
}

/// Submit a sponsorship offer; funds are held in escrow until resolution
#[utoipa::path(
    post,
    path = "/sponsorship-requests",
    request_body = CreateOfferRequest,
    responses(
        (status = 201, description = "Offer submitted, funds held", body = OfferResponse),
        (status = 400, description = "Invalid amount, tier mismatch, or wrong recipient"),
        (status = 401, description = "Missing or unknown bearer token"),
        (status = 403, description = "Only sponsor profiles may submit offers"),
        (status = 404, description = "Campaign or tier missing"),
        (status = 409, description = "Campaign is not accepting offers")
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(sponsor_id = %caller.0.id, campaign_id = %request.campaign_id))]
pub async fn create_offer(
    State(state): State<AppState>,
    caller: AuthenticatedProfile,
    Json(request): Json<CreateOfferRequest>,
) -> Result<impl IntoResponse, AppError> {
    if caller.0.profile_type != ProfileType::Sponsor {
        return Err(AppError::Forbidden(
            "only sponsor profiles may submit offers".to_string(),
        ));
    }
    // Resolve the recipient through the profile directory before touching
    // the campaign.
    let recipient = directory::recipient_profile(&state.db, request.athlete_id).await?;

    let resolved = offers::submit_offer(
        &state.db,
        offers::NewOffer {
            campaign_id: request.campaign_id,
            sponsor_id: caller.0.id,
            recipient_id: recipient.id,
            perk_tier_id: request.perk_tier_id,
            amount: request.amount,
            is_custom: request.is_custom,
            custom_perks: request.custom_perks,
            message: request.message,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(OfferResponse::from(resolved))))
}

/// Resolve an offer: approve or reject as recipient, cancel as sponsor
#[utoipa::path(
    put,
    path = "/sponsorship-requests",
    request_body = UpdateOfferRequest,
    responses(
        (status = 200, description = "Offer transitioned", body = OfferResponse),
        (status = 400, description = "Requested status is not a valid target"),
        (status = 401, description = "Missing or unknown bearer token"),
        (status = 403, description = "Caller is neither the sponsor nor the recipient"),
        (status = 404, description = "No such offer"),
        (status = 409, description = "Offer state or tier capacity does not allow it")
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(caller_id = %caller.0.id, offer_id = %request.id))]
pub async fn update_offer(
    State(state): State<AppState>,
    caller: AuthenticatedProfile,
    Json(request): Json<UpdateOfferRequest>,
) -> Result<impl IntoResponse, AppError> {
    let resolved = match request.status {
        RequestStatus::Active => offers::approve_offer(&state.db, request.id, caller.0.id).await?,
        RequestStatus::Rejected => offers::reject_offer(&state.db, request.id, caller.0.id).await?,
        RequestStatus::Cancelled => offers::cancel_offer(&state.db, request.id, caller.0.id).await?,
        RequestStatus::Pending => {
            return Err(AppError::InvalidInput(
                "an offer cannot be returned to PENDING".to_string(),
            ))
        }
    };

    Ok((StatusCode::OK, Json(OfferResponse::from(resolved))))
}

/// List the caller's offers, newest first
#[utoipa::path(
    get,
    path = "/sponsorship-requests",
    params(ListOffersQuery),
    responses(
        (status = 200, description = "Matching offers", body = Vec<OfferResponse>),
        (status = 401, description = "Missing or unknown bearer token")
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip(state, caller, query), fields(caller_id = %caller.0.id))]
pub async fn list_offers(
    State(state): State<AppState>,
    caller: AuthenticatedProfile,
    Query(query): Query<ListOffersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let role = match query.role {
        OfferRoleParam::Sponsor => OfferRole::Sponsor,
        OfferRoleParam::Athlete => OfferRole::Recipient,
    };
    let resolved = offers::list_offers(
        &state.db,
        caller.0.id,
        role,
        OfferFilter {
            status: query.status,
            campaign_id: query.campaign_id,
        },
    )
    .await?;

    let response: Vec<OfferResponse> = resolved.into_iter().map(OfferResponse::from).collect();
    Ok((StatusCode::OK, Json(response)))
}
