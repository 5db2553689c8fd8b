//! Identity endpoint behind the optional gate

use axum::{extract::State, Extension, Json};
use coli_rich_common::api::AuthContext;
use serde::Serialize;

use crate::AppState;

/// Who the caller is and whether they could submit enrichments
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub uris: Vec<String>,
    pub user_providers: Vec<String>,
    pub authorized: bool,
}

/// GET /auth
///
/// Never refuses; anonymous callers get empty lists.
pub async fn get_identity(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> Json<IdentityResponse> {
    let authorized = context
        .user
        .as_ref()
        .map(|identity| state.gate.policy().admits(identity))
        .unwrap_or(false);

    Json(IdentityResponse {
        uris: context.uris,
        user_providers: context.user_providers,
        authorized,
    })
}
