use axum::{
    extract::{Path, Query, State},
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
use crate::engine::{aggregator, store};
use crate::entities::{campaign, perk_tier, CampaignStatus, ProfileType};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCampaignRequest {
    /// Campaign headline
    pub title: String,
    /// Longer pitch shown on the campaign page
    #[serde(default)]
    pub description: String,
    /// Funding goal; must be positive
    pub goal_amount: Decimal,
    /// Deadline after which the campaign stops accepting offers if the
    /// goal was not reached
    pub deadline: DateTime<Utc>,
    /// Perk tiers; may be empty, custom offers are always possible
    #[serde(default)]
    pub tiers: Vec<CreateTierRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTierRequest {
    /// Tier name, e.g. "Gold sponsor"
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Minimum contribution for this tier; must be positive
    pub amount: Decimal,
    /// Maximum number of approved sponsors; omit for unlimited
    #[serde(default)]
    pub max_sponsors: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TierResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub amount: Decimal,
    /// None means unlimited
    pub max_sponsors: Option<i32>,
    pub current_sponsors: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_type: ProfileType,
    pub title: String,
    pub description: String,
    pub goal_amount: Decimal,
    /// Derived: sum of the amounts of all ACTIVE offers
    pub current_funding: Decimal,
    pub deadline: DateTime<Utc>,
    pub status: CampaignStatus,
    /// Sorted ascending by amount
    pub tiers: Vec<TierResponse>,
    pub created_at: DateTime<Utc>,
}

impl CampaignResponse {
    pub fn from_parts(record: campaign::Model, tiers: Vec<perk_tier::Model>) -> Self {
        CampaignResponse {
            id: record.id,
            owner_id: record.owner_id,
            owner_type: record.owner_type,
            title: record.title,
            description: record.description,
            goal_amount: record.goal_amount,
            current_funding: record.current_funding,
            deadline: record.deadline,
            status: record.status,
            tiers: tiers
                .into_iter()
                .map(|tier| TierResponse {
                    id: tier.id,
                    name: tier.name,
                    description: tier.description,
                    amount: tier.amount,
                    max_sponsors: tier.max_sponsors,
                    current_sponsors: tier.current_sponsors,
                })
                .collect(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCampaignsQuery {
    /// Filter by owning profile id
    #[serde(default)]
    #[param(required = false)]
    pub owner_id: Option<Uuid>,
    /// Filter by owning profile type
    #[serde(default)]
    #[param(required = false)]
    pub owner_type: Option<ProfileType>,
    /// Filter by campaign status
    #[serde(default)]
    #[param(required = false)]
    pub status: Option<CampaignStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCampaignRequest {
    /// Requested status; only COMPLETED and CANCELLED are owner-settable
    pub status: CampaignStatus,
}

/// Publish a campaign with its perk tiers
#[utoipa::path(
    post,
    path = "/campaigns",
    request_body = CreateCampaignRequest,
    responses(
        (status = 201, description = "Campaign created", body = CampaignResponse),
        (status = 400, description = "Invalid campaign or tier data"),
        (status = 401, description = "Missing or unknown bearer token"),
        (status = 403, description = "Sponsor profiles cannot publish campaigns")
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(owner_id = %caller.0.id))]
pub async fn create_campaign(
    State(state): State<AppState>,
    caller: AuthenticatedProfile,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = store::NewCampaign {
        title: request.title,
        description: request.description,
        goal_amount: request.goal_amount,
        deadline: request.deadline,
        tiers: request
            .tiers
            .into_iter()
            .map(|tier| store::NewPerkTier {
                name: tier.name,
                description: tier.description,
                amount: tier.amount,
                max_sponsors: tier.max_sponsors,
            })
            .collect(),
    };

    let (record, tiers) = store::create_campaign(&state.db, &caller.0, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CampaignResponse::from_parts(record, tiers)),
    ))
}

/// Fetch one campaign with its tiers (tiers ascending by amount)
#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign found", body = CampaignResponse),
        (status = 404, description = "No such campaign")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (record, tiers) = store::get_campaign(&state.db, id).await?;
    Ok((StatusCode::OK, Json(CampaignResponse::from_parts(record, tiers))))
}

/// List campaigns, optionally filtered by owner, owner type, or status
#[utoipa::path(
    get,
    path = "/campaigns",
    params(ListCampaignsQuery),
    responses(
        (status = 200, description = "Matching campaigns", body = Vec<CampaignResponse>)
    )
)]
#[tracing::instrument(skip(state, query))]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let records = store::list_campaigns(
        &state.db,
        store::CampaignFilter {
            owner_id: query.owner_id,
            owner_type: query.owner_type,
            status: query.status,
        },
    )
    .await?;

    // Listing is a snapshot read; tiers are fetched per campaign only on
    // the detail endpoint.
    let response: Vec<CampaignResponse> = records
        .into_iter()
        .map(|record| CampaignResponse::from_parts(record, Vec::new()))
        .collect();
    Ok((StatusCode::OK, Json(response)))
}

/// Owner-only campaign status change: confirm COMPLETED or CANCEL
#[utoipa::path(
    put,
    path = "/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = UpdateCampaignRequest,
    responses(
        (status = 200, description = "Campaign updated", body = CampaignResponse),
        (status = 400, description = "Requested status is not owner-settable"),
        (status = 403, description = "Caller does not own the campaign"),
        (status = 404, description = "No such campaign"),
        (status = 409, description = "Campaign state does not allow the change")
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip(state, caller, request), fields(caller_id = %caller.0.id))]
pub async fn update_campaign(
    State(state): State<AppState>,
    caller: AuthenticatedProfile,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Cheap ownership pre-check; the engine re-validates inside its
    // transaction.
    let owner_id = directory::owner_of(&state.db, id).await?;
    if owner_id != caller.0.id {
        return Err(AppError::Forbidden(
            "only the campaign owner may change its status".to_string(),
        ));
    }

    let record = match request.status {
        CampaignStatus::Completed => aggregator::confirm_completed(&state.db, id, caller.0.id).await?,
        CampaignStatus::Cancelled => aggregator::cancel_campaign(&state.db, id, caller.0.id).await?,
        other => {
            return Err(AppError::InvalidInput(format!(
                "campaign status {:?} cannot be requested directly",
                other
            )))
        }
    };

    let (record, tiers) = store::get_campaign(&state.db, record.id).await?;
    Ok((StatusCode::OK, Json(CampaignResponse::from_parts(record, tiers))))
}
