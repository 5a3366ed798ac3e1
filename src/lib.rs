use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
// Conditionally import SwaggerUi only when needed (not test)
#[cfg(not(test))]
use utoipa_swagger_ui::SwaggerUi;
// Conditionally import CORS only when needed (not test)
#[cfg(not(test))]
use tower_http::cors::{Any, CorsLayer};
use utoipa::{Modify, OpenApi};
// Conditionally import Governor only when needed (not test)
#[cfg(not(test))]
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
    GovernorLayer,
};
#[cfg(not(test))]
use std::num::NonZeroU32;
#[cfg(not(test))]
use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub mod auth;
pub mod db;
pub mod directory;
pub mod engine;
pub mod entities;
pub mod error;
pub mod jobs;
pub mod routes;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SPONSORLINK API",
        version = "0.1.0"
    ),
    modifiers(&SecurityAddon),
    paths(
        health_check,
        routes::profiles::register_profile,
        routes::campaigns::create_campaign,
        routes::campaigns::get_campaign,
        routes::campaigns::list_campaigns,
        routes::campaigns::update_campaign,
        routes::sponsorship_requests::create_offer,
        routes::sponsorship_requests::update_offer,
        routes::sponsorship_requests::list_offers
    ),
    components(schemas(
        routes::profiles::RegisterProfileRequest,
        routes::profiles::RegisterProfileResponse,
        routes::campaigns::CreateCampaignRequest,
        routes::campaigns::CreateTierRequest,
        routes::campaigns::TierResponse,
        routes::campaigns::CampaignResponse,
        routes::campaigns::UpdateCampaignRequest,
        routes::sponsorship_requests::CreateOfferRequest,
        routes::sponsorship_requests::UpdateOfferRequest,
        routes::sponsorship_requests::OfferResponse
    ))
)]
struct ApiDoc;

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // --- Define API routes separately ---
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/profiles", post(routes::profiles::register_profile))
        .route(
            "/campaigns",
            post(routes::campaigns::create_campaign).get(routes::campaigns::list_campaigns),
        )
        .route(
            "/campaigns/{id}",
            get(routes::campaigns::get_campaign).put(routes::campaigns::update_campaign),
        )
        .route(
            "/sponsorship-requests",
            post(routes::sponsorship_requests::create_offer)
                .put(routes::sponsorship_requests::update_offer)
                .get(routes::sponsorship_requests::list_offers),
        )
        .with_state(state);

    // --- Conditionally apply layers and Swagger UI only when NOT running tests ---
    #[cfg(not(test))]
    let (docs_router, rate_limited_api_routes) = {
        // Create Swagger UI router
        let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

        // Configure Rate Limiting
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .period(std::time::Duration::from_secs(60))
                .burst_size(NonZeroU32::new(30).unwrap().into())
                .finish()
                .unwrap(),
        );
        // Apply Governor layer ONLY to the api_routes defined above
        let rate_limited_api_routes = api_routes.layer(GovernorLayer { config: governor_conf });

        (docs_router, rate_limited_api_routes)
    };

    // For test builds, use the original api_routes and an empty router for docs
    #[cfg(test)]
    let (docs_router, rate_limited_api_routes) = (Router::new(), api_routes);

    // --- Build the final application router ---
    let mut app = Router::new()
        .merge(rate_limited_api_routes) // Add rate-limited API routes
        .merge(docs_router);            // Add documentation routes (not rate-limited)

    // --- Apply CORS to the whole app (both API and docs) if needed ---
    #[cfg(not(test))]
    {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    // Return the final router
    app
}
