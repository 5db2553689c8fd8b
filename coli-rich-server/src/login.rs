//! Login-server discovery
//!
//! The login server publishes its signing algorithm and public key at
//! `{login}about`. The key is fetched exactly once at startup. Any failure
//! leaves authorization disabled for the lifetime of the process: every
//! request to a route behind the main gate is then refused.

use std::time::Duration;

use anyhow::{Context, Result};
use coli_rich_common::api::{LoginAbout, SigningKey};
use tracing::{error, info};

/// Upper bound for the discovery request
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch the signing key, logging and swallowing any failure
///
/// `login_server` must end with `/`.
pub async fn discover_signing_key(login_server: &str) -> Option<SigningKey> {
    let about_url = format!("{}about", login_server);

    match fetch_signing_key(&about_url).await {
        Ok(key) => {
            info!(
                "✓ Configured authentication via {} ({:?})",
                login_server,
                key.algorithm()
            );
            Some(key)
        }
        Err(e) => {
            error!(
                "Error loading about for configured login server from {}: {:#}",
                about_url, e
            );
            error!("Endpoints requiring authentication will refuse all requests");
            None
        }
    }
}

async fn fetch_signing_key(about_url: &str) -> Result<SigningKey> {
    let client = reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let about: LoginAbout = client
        .get(about_url)
        .send()
        .await
        .context("Request failed")?
        .error_for_status()
        .context("Login server returned an error status")?
        .json()
        .await
        .context("Malformed about response")?;

    Ok(about.into_signing_key()?)
}
