//! coli-rich-server library
//!
//! HTTP surface of the enrichment service: submissions of PICA patches are
//! authorized against a login server's credentials, stored write-once under
//! their content hash and served back read-only.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use coli_rich_common::api::{AccessPolicy, SigningKey};
use coli_rich_common::config::Config;
use coli_rich_common::EnrichmentStore;
use tower_http::{
    catch_panic::CatchPanicLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod api;
pub mod error;
pub mod login;

pub use crate::api::auth::AuthGate;
pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration, read-only after startup
    pub config: Arc<Config>,
    /// Enrichment store
    pub store: Arc<EnrichmentStore>,
    /// Authorization gate holding the login server's key, if discovered
    pub gate: Arc<AuthGate>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, store: EnrichmentStore, signing_key: Option<SigningKey>) -> Self {
        let gate = AuthGate::new(signing_key, AccessPolicy::from_config(&config));
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            gate: Arc::new(gate),
        }
    }
}

/// Build application router
///
/// - `POST /enrichment/` behind the main gate
/// - `GET /enrichment/`, `GET /enrichment/:id` public
/// - `GET /auth` behind the optional gate
/// - `GET /config`, `GET /health` public
pub fn build_router(state: AppState) -> Router {
    let submit = post(api::submit_enrichment)
        .layer(DefaultBodyLimit::max(api::MAX_ENRICHMENT_BYTES))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_auth,
        ));
    let collection = submit.get(api::list_enrichments);

    let item = get(api::get_enrichment)
        .put(api::reject_modification)
        .patch(api::reject_modification)
        .delete(api::reject_modification);

    let identity = get(api::get_identity).route_layer(middleware::from_fn_with_state(
        state.clone(),
        api::optional_auth,
    ));

    let mut router = Router::new()
        .route("/enrichment", collection.clone())
        .route("/enrichment/", collection)
        .route("/enrichment/:id", item)
        .route("/auth", identity)
        .route("/config", get(api::get_client_config))
        .merge(api::health_routes());

    // Built frontend assets; unknown paths get index.html for client-side routing
    if let Some(dir) = &state.config.static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }

    router
        .with_state(state)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(middleware::from_fn(error::localize_errors))
        .layer(TraceLayer::new_for_http())
}
