//! Client configuration endpoint
//!
//! Exposes the non-secret parts of the configuration a frontend needs to
//! drive its login flow.

use axum::{extract::State, Json};
use coli_rich_common::config::Mode;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub name: String,
    pub version: String,
    pub mode: Mode,
    pub login_server: Option<String>,
    /// `["*"]` when any user is admitted
    pub allowed_users: Vec<String>,
    pub allowed_providers: Vec<String>,
    pub provider_access: bool,
}

/// GET /config
pub async fn get_client_config(State(state): State<AppState>) -> Json<ClientConfig> {
    let config = &state.config;
    Json(ClientConfig {
        name: "coli-rich".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: config.mode,
        login_server: config.login_server.clone(),
        allowed_users: config.allowed_users.entries(),
        allowed_providers: config.allowed_providers.entries(),
        provider_access: config.provider_access,
    })
}
