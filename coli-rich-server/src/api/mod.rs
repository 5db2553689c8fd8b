//! HTTP API handlers for coli-rich-server

pub mod auth;
pub mod client_config;
pub mod enrichment;
pub mod health;
pub mod identity;

pub use auth::{optional_auth, require_auth};
pub use client_config::get_client_config;
pub use enrichment::{
    get_enrichment, list_enrichments, reject_modification, submit_enrichment,
    MAX_ENRICHMENT_BYTES,
};
pub use health::health_routes;
pub use identity::get_identity;
