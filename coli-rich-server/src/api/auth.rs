//! Authorization gate and its middleware
//!
//! Two request filters share one gate:
//! - [`require_auth`] (main): a verified credential from an allowed principal
//!   is mandatory; every failure is `ForbiddenAccessError`.
//! - [`optional_auth`]: verification is attempted, failures make the request
//!   anonymous, nothing is blocked.
//!
//! Both insert an [`AuthContext`] into the request extensions.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use coli_rich_common::api::{bearer_token, AccessPolicy, AuthContext, Identity, SigningKey};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Credential verification plus access policy
#[derive(Debug, Clone)]
pub struct AuthGate {
    /// `None` when no login server is configured or discovery failed
    signing_key: Option<SigningKey>,
    policy: AccessPolicy,
}

impl AuthGate {
    pub fn new(signing_key: Option<SigningKey>, policy: AccessPolicy) -> Self {
        Self {
            signing_key,
            policy,
        }
    }

    /// Whether credentials can be verified at all
    pub fn is_configured(&self) -> bool {
        self.signing_key.is_some()
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Main gate: verified and allowed, or refused
    pub fn authorize(&self, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
        let Some(key) = &self.signing_key else {
            return Err(ApiError::forbidden(
                "Access forbidden. No authentication configured.",
            ));
        };

        let identity = verify(key, headers).ok_or_else(|| {
            ApiError::forbidden("Access forbidden. Could not authenticate via JWT.")
        })?;

        if !self.policy.admits(&identity) {
            debug!("Refusing {:?}: not on the allowed list", identity.uri);
            return Err(ApiError::forbidden(
                "Access forbidden. User is not on the allowed list.",
            ));
        }

        Ok(AuthContext::from_identity(identity))
    }

    /// Optional gate: best-effort identification
    pub fn identify(&self, headers: &HeaderMap) -> AuthContext {
        self.signing_key
            .as_ref()
            .and_then(|key| verify(key, headers))
            .map(AuthContext::from_identity)
            .unwrap_or_else(AuthContext::anonymous)
    }
}

/// Verify the request's bearer credential, if any
fn verify(key: &SigningKey, headers: &HeaderMap) -> Option<Identity> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = bearer_token(header)?;
    match key.verify(token) {
        Ok(identity) => Some(identity),
        Err(e) => {
            debug!("Credential rejected: {}", e);
            None
        }
    }
}

/// Main authorization middleware
///
/// Applied to write routes only.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = state.gate.authorize(request.headers())?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Optional authorization middleware; never blocks
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = state.gate.identify(request.headers());
    request.extensions_mut().insert(context);
    next.run(request).await
}
