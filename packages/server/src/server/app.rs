//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use gemini_client::ResearchManager;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::auth::JwtService;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    cancel_deep_research, health_handler, poll_deep_research, run_deep_research_sync,
    start_deep_research,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub research: Arc<ResearchManager>,
    pub jwt_service: Arc<JwtService>,
}

impl AxumAppState {
    /// Build the provider manager and token verifier from configuration.
    ///
    /// A missing or blank Gemini API key fails here, before the listener binds.
    pub fn from_config(config: &Config) -> Result<Self> {
        let research = ResearchManager::new(config.gemini.clone())
            .context("Failed to initialize Gemini research manager")?;

        Ok(Self {
            research: Arc::new(research),
            jwt_service: Arc::new(JwtService::new(
                &config.jwt_secret,
                config.jwt_issuer.clone(),
            )),
        })
    }
}

/// Routes for the deep research provider, relative to `<prefix>/gemini`.
fn deep_research_routes() -> Router {
    Router::new()
        .route("/deep-research", post(start_deep_research))
        .route("/deep-research/sync", post(run_deep_research_sync))
        .route(
            "/deep-research/:interaction_id",
            get(poll_deep_research).delete(cancel_deep_research),
        )
}

/// Normalize a route prefix to `/segment[/segment]` or empty.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the Axum application router
pub fn build_app(state: AxumAppState, allowed_origins: &[String], api_prefix: &str) -> Router {
    let api = Router::new().nest("/gemini", deep_research_routes());

    let prefix = normalize_prefix(api_prefix);
    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    // Clone jwt_service for middleware closure
    let jwt_service = state.jwt_service.clone();

    router
        // Health check (no auth)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
