//! Error types for coli-rich-server
//!
//! One closed set of error kinds. Each kind carries its HTTP status and a
//! bilingual label map. Every handler and middleware error is converted to a
//! response in exactly one place ([`ApiError::into_response`]); the
//! [`localize_errors`] middleware then picks the message language.

use std::any::Any;
use std::collections::BTreeMap;

use axum::{
    extract::Request,
    http::{
        header::{ACCEPT_LANGUAGE, ALLOW},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

/// Language used when a label has no entry for any preferred language
pub const DEFAULT_LANGUAGE: &str = "en";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Credential present but not acceptable (401)
    #[error("{}", .0.as_deref().unwrap_or(UNAUTHORIZED.en))]
    Unauthorized(Option<String>),

    /// Credential missing, invalid, or principal not allowed (403)
    #[error("{}", .0.as_deref().unwrap_or(FORBIDDEN.en))]
    Forbidden(Option<String>),

    /// Requested enrichment absent or id malformed (404)
    #[error("The requested entity {id} could not be found.")]
    NotFound { id: String },

    /// Storage failure; the cause is logged where it happened (500)
    #[error("{}", .0.as_deref().unwrap_or(BACKEND.en))]
    Backend(Option<String>),

    /// Stubbed route (501)
    #[error("{}", .0.as_deref().unwrap_or(NOT_IMPLEMENTED.en))]
    NotImplemented(Option<String>),

    /// Anything unrecognised; the detail never reaches the client (500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Request refused by the HTTP layer before reaching a handler
    /// (unsupported method, oversized or unreadable body)
    #[error("Request rejected with status {0}")]
    Rejected(StatusCode),
}

/// Built-in bilingual message
struct Label {
    en: &'static str,
    de: &'static str,
}

const UNAUTHORIZED: Label = Label {
    en: "Access is not authorized.",
    de: "Zugriff nicht authorisiert.",
};

const FORBIDDEN: Label = Label {
    en: "Access is forbidden.",
    de: "Zugriff nicht erlaubt.",
};

const BACKEND: Label = Label {
    en: "There was an unknown error with the backend.",
    de: "Es gab einen unbekannten Backend-Fehler.",
};

const BAD_REQUEST: Label = Label {
    en: "The request could not be processed.",
    de: "Die Anfrage konnte nicht verarbeitet werden.",
};

const METHOD_NOT_ALLOWED: Label = Label {
    en: "This method is not supported for the requested resource.",
    de: "Diese Methode wird für die angefragte Ressource nicht unterstützt.",
};

const PAYLOAD_TOO_LARGE: Label = Label {
    en: "The request body is too large.",
    de: "Der Inhalt der Anfrage ist zu groß.",
};

const NOT_IMPLEMENTED: Label = Label {
    en: "Not yet implemented.",
    de: "Funktion noch nicht implementiert.",
};

impl ApiError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(Some(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Backend(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Rejected(status) => *status,
        }
    }

    /// Kind name reported in the `error` field
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UnauthorizedAccessError",
            ApiError::Forbidden(_) => "ForbiddenAccessError",
            ApiError::NotFound { .. } => "EntityNotFoundError",
            ApiError::Backend(_) => "BackendError",
            ApiError::NotImplemented(_) => "NotImplementedError",
            ApiError::Internal(_) | ApiError::Rejected(_) => "Error",
        }
    }

    /// Label map; a custom message replaces the built-in translations
    pub fn pref_label(&self) -> BTreeMap<String, String> {
        let no_message = None;
        let (custom, label) = match self {
            ApiError::Unauthorized(message) => (message, &UNAUTHORIZED),
            ApiError::Forbidden(message) => (message, &FORBIDDEN),
            ApiError::Backend(message) => (message, &BACKEND),
            ApiError::NotImplemented(message) => (message, &NOT_IMPLEMENTED),
            ApiError::Internal(_) => (&no_message, &BACKEND),
            ApiError::Rejected(status) => {
                let label = match *status {
                    StatusCode::METHOD_NOT_ALLOWED => &METHOD_NOT_ALLOWED,
                    StatusCode::PAYLOAD_TOO_LARGE => &PAYLOAD_TOO_LARGE,
                    _ => &BAD_REQUEST,
                };
                (&no_message, label)
            }
            ApiError::NotFound { id } => {
                return BTreeMap::from([
                    (
                        "en".to_string(),
                        format!("The requested entity {} could not be found.", id),
                    ),
                    (
                        "de".to_string(),
                        format!("Die abgefragte Entität {} konnte nicht gefunden werden.", id),
                    ),
                ]);
            }
        };

        match custom {
            Some(message) => BTreeMap::from([("en".to_string(), message.clone())]),
            None => BTreeMap::from([
                ("en".to_string(), label.en.to_string()),
                ("de".to_string(), label.de.to_string()),
            ]),
        }
    }
}

impl ApiError {
    /// Error for a plain framework response that bypassed [`ApiError`]
    ///
    /// Covers the statuses axum produces on its own for routed requests;
    /// anything else is left untouched.
    pub fn from_rejection(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::BAD_REQUEST
            | StatusCode::METHOD_NOT_ALLOWED
            | StatusCode::PAYLOAD_TOO_LARGE => Some(ApiError::Rejected(status)),
            _ => None,
        }
    }

    fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            status: self.status(),
            pref_label: self.pref_label(),
        }
    }
}

impl From<coli_rich_common::Error> for ApiError {
    fn from(err: coli_rich_common::Error) -> Self {
        use coli_rich_common::Error as CommonError;

        match err {
            CommonError::NotFound(id) | CommonError::InvalidId(id) => ApiError::NotFound { id },
            CommonError::Credential(reason) => {
                warn!("Credential rejected: {}", reason);
                ApiError::Forbidden(None)
            }
            other => {
                error!("Backend failure: {}", other);
                ApiError::Backend(None)
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Rendered error carried in the response extensions for [`localize_errors`]
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub status: StatusCode,
    pub pref_label: BTreeMap<String, String>,
}

impl ErrorReport {
    /// First preferred language with a label, else `en`, else any
    pub fn resolve_language<'a>(&'a self, preferred: &'a [String]) -> &'a str {
        preferred
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(DEFAULT_LANGUAGE))
            .find(|lang| self.pref_label.contains_key(*lang))
            .or_else(|| self.pref_label.keys().next().map(String::as_str))
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn body(&self, language: &str) -> Value {
        let message = self.pref_label.get(language).cloned().unwrap_or_default();
        json!({
            "error": self.kind,
            "status": self.status.as_u16(),
            "message": message,
            "prefLabel": self.pref_label,
        })
    }

    fn render(self, language: &str) -> Response {
        let mut response = (self.status, Json(self.body(language))).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Unhandled error: {}", detail);
        }

        let report = self.report();
        let language = report.resolve_language(&[]).to_string();
        report.render(&language)
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Languages from an `Accept-Language` header, most preferred first
///
/// Only primary subtags are kept (`de-DE` becomes `de`); entries with
/// `q=0` and the `*` range are dropped.
pub fn preferred_languages(header: &str) -> Vec<String> {
    let mut ranked: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|item| {
            let mut params = item.split(';');
            let tag = params.next()?.trim();
            let primary = tag.split('-').next()?.trim().to_ascii_lowercase();
            if primary.is_empty() || primary == "*" {
                return None;
            }
            let quality = params
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then_some((primary, quality))
        })
        .collect();

    // Stable sort keeps header order among equal weights
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut languages: Vec<String> = Vec::new();
    for (language, _) in ranked {
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    languages
}

/// Re-render error bodies in the language the client prefers
///
/// Bare framework rejections (405, 413, ...) are rewritten into the same
/// JSON shape; an `Allow` header is kept.
pub async fn localize_errors(request: Request, next: Next) -> Response {
    let preferred = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(preferred_languages)
        .unwrap_or_default();

    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        let Some(rejection) = ApiError::from_rejection(response.status()) else {
            return response;
        };
        let allow = response.headers().get(ALLOW).cloned();
        let report = rejection.report();
        let language = report.resolve_language(&preferred).to_string();
        let mut rendered = report.render(&language);
        if let Some(allow) = allow {
            rendered.headers_mut().insert(ALLOW, allow);
        }
        return rendered;
    };
    let language = report.resolve_language(&preferred).to_string();
    if language == DEFAULT_LANGUAGE {
        return response;
    }
    report.render(&language)
}

/// Response for a panicking handler
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}
