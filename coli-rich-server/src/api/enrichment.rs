//! Enrichment endpoints
//!
//! - `POST /enrichment/`: store a PICA patch under its content hash
//! - `GET /enrichment/`: plain-text listing, one `<uri> <createdAt>` per line
//! - `GET /enrichment/:id`: the stored patch verbatim
//!
//! The store is append-only; modification methods answer 501.

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, OriginalUri, Path, State},
    http::{
        header::{CONTENT_TYPE, DATE, HOST, LOCATION},
        HeaderMap, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use coli_rich_common::api::AuthContext;
use coli_rich_common::config::Config;
use coli_rich_common::{derive_id, is_valid_id, PutOutcome};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Request body limit for submissions (10MB)
pub const MAX_ENRICHMENT_BYTES: usize = 10 * 1024 * 1024;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Response to a successful submission
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub uri: String,
    pub ok: u8,
}

/// POST /enrichment/
///
/// Requires the main gate. Resubmitting identical content succeeds again
/// with the same id without rewriting anything.
pub async fn submit_enrichment(
    State(state): State<AppState>,
    Extension(context): Extension<AuthContext>,
    OriginalUri(original_uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let id = derive_id(&body);
    let uri = format!("{}{}", request_base(&state.config, &headers, &original_uri), id);

    let store = state.store.clone();
    let stored_id = id.clone();
    let outcome = tokio::task::spawn_blocking(move || store.put(&stored_id, &body)).await??;

    let submitter = context.uris.first().map(String::as_str).unwrap_or("unknown");
    match outcome {
        PutOutcome::Created => info!("Enrichment {} created by {}", id, submitter),
        PutOutcome::Existing => info!("Enrichment {} resubmitted by {}", id, submitter),
    }

    Ok((
        StatusCode::CREATED,
        [(LOCATION, uri.clone())],
        Json(SubmitResponse { id, uri, ok: 1 }),
    )
        .into_response())
}

/// GET /enrichment/
pub async fn list_enrichments(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let base = request_base(&state.config, &headers, &original_uri);

    let store = state.store.clone();
    let entries = tokio::task::spawn_blocking(move || store.list()).await??;

    let mut listing = String::new();
    for entry in &entries {
        listing.push_str(&format!("{}{} {}\n", base, entry.id, entry.created_at_iso()));
    }

    Ok(([(CONTENT_TYPE, TEXT_PLAIN)], listing).into_response())
}

/// GET /enrichment/:id
///
/// The `Date` header carries the record's creation time.
pub async fn get_enrichment(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    uri: Uri,
) -> ApiResult<Response> {
    // Ids that do not even decode (e.g. `%FF`) are just another malformed id
    let id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => {
            debug!("Undecodable enrichment id in {}: {}", uri.path(), rejection);
            return Err(ApiError::NotFound {
                id: last_segment(&uri).to_string(),
            });
        }
    };
    if !is_valid_id(&id) {
        return Err(ApiError::NotFound { id });
    }

    let store = state.store.clone();
    let record = tokio::task::spawn_blocking(move || store.get(&id)).await??;

    Ok((
        [
            (CONTENT_TYPE, TEXT_PLAIN.to_string()),
            (DATE, http_date(record.created_at)),
        ],
        record.content,
    )
        .into_response())
}

/// PUT/PATCH/DELETE /enrichment/:id
pub async fn reject_modification() -> ApiError {
    ApiError::NotImplemented(None)
}

/// Absolute URL of the collection the request addressed, ending in `/`
///
/// The origin is the configured public base URL, or `http://<Host>`.
fn request_base(config: &Config, headers: &HeaderMap, uri: &Uri) -> String {
    let origin = match &config.base_url {
        Some(base_url) => base_url.clone(),
        None => {
            let host = headers
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .or_else(|| uri.authority().map(|authority| authority.as_str()))
                .unwrap_or("localhost");
            format!("http://{}", host)
        }
    };

    let mut base = format!("{}{}", origin, uri.path());
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Raw, still percent-encoded, final path segment
fn last_segment(uri: &Uri) -> &str {
    uri.path().rsplit('/').next().unwrap_or_default()
}

/// IMF-fixdate, e.g. `Wed, 01 May 2024 10:00:00 GMT`
fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
