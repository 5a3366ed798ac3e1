use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{profile, Profiles};
use crate::error::AppError;
use crate::AppState;

/// The caller identity attached to a request, resolved from the bearer
/// credential by the identity provider.
pub struct AuthenticatedProfile(pub profile::Model);

/// Resolve a bearer credential to a profile.
pub async fn resolve_caller(
    db: &DatabaseConnection,
    token: &str,
) -> Result<profile::Model, AppError> {
    Profiles::find()
        .filter(profile::Column::ApiToken.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown bearer token".to_string()))
}

impl FromRequestParts<AppState> for AuthenticatedProfile {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a bearer token".to_string()))?;

        let caller = resolve_caller(&state.db, token.trim()).await?;
        Ok(AuthenticatedProfile(caller))
    }
}
