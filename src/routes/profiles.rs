use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{profile, ProfileType};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterProfileRequest {
    /// Human-readable name shown on campaigns and offers
    pub display_name: String,
    /// ATHLETE, TEAM, EVENT, or SPONSOR
    pub profile_type: ProfileType,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterProfileResponse {
    /// Identifier used to reference this profile
    pub id: Uuid,
    pub display_name: String,
    pub profile_type: ProfileType,
    /// Bearer token for authenticating subsequent requests
    pub api_token: String,
}

/// Register a profile (campaign owner or sponsor) and issue its API token
#[utoipa::path(
    post,
    path = "/profiles",
    request_body = RegisterProfileRequest,
    responses(
        (status = 201, description = "Profile registered", body = RegisterProfileResponse),
        (status = 400, description = "Invalid profile data"),
        (status = 503, description = "Storage unavailable")
    )
)]
#[tracing::instrument(skip(state, request), fields(profile_type = ?request.profile_type))]
pub async fn register_profile(
    State(state): State<AppState>,
    Json(request): Json<RegisterProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.display_name.trim().is_empty() {
        return Err(AppError::InvalidInput("display_name must not be empty".to_string()));
    }

    let record = profile::ActiveModel {
        id: Set(Uuid::new_v4()),
        display_name: Set(request.display_name),
        profile_type: Set(request.profile_type),
        api_token: Set(Uuid::new_v4().to_string()),
        created_at: Set(Utc::now()),
    };
    let record = record.insert(&state.db).await?;

    tracing::info!(profile_id = %record.id, "profile registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterProfileResponse {
            id: record.id,
            display_name: record.display_name,
            profile_type: record.profile_type,
            api_token: record.api_token,
        }),
    ))
}
