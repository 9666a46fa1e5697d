//! policysim-api library - tiered policy impact analysis service
//!
//! Authenticates callers against the hosted identity service, resolves
//! their subscription tier, dispatches a tier-specific prompt to the
//! text-generation API and records each exchange.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

use services::{HistoryRecorder, IdentityProvider, PromptDispatcher, TextGenerator, TierResolver};
use store::{HistoryStore, UserStore};

/// Application state shared across HTTP handlers
///
/// Holds only client handles and immutable data; requests share no
/// mutable state.
#[derive(Clone)]
pub struct AppState {
    /// Hosted identity service
    pub identity: Arc<dyn IdentityProvider>,
    /// Stored tier lookup and changes
    pub tiers: TierResolver,
    /// Prompt composition and text generation
    pub dispatcher: PromptDispatcher,
    /// Exchange persistence
    pub recorder: HistoryRecorder,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state from collaborator handles
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
        history: Arc<dyn HistoryStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            identity,
            tiers: TierResolver::new(users),
            dispatcher: PromptDispatcher::new(generator),
            recorder: HistoryRecorder::new(history),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// `/health` and the session endpoints are public; everything else under
/// `/api` requires a bearer credential.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/simulate", post(api::simulate))
        .route("/api/history", get(api::list_history))
        .route("/api/tier", get(api::get_tier).put(api::change_tier))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .merge(api::session_routes())
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        // Outside the auth middleware: a declared oversized body is refused
        // before the credential is verified
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::map_response(error::payload_too_large_as_json))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
