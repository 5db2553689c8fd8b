//! # coli-rich Common Library
//!
//! Shared code for the coli-rich enrichment service:
//! - Content-derived enrichment identifiers
//! - Filesystem-backed, write-once enrichment store
//! - Configuration model and resolution
//! - Credential verification and access policy (no HTTP framework dependencies)
//! - PICA patch builder used by clients to produce enrichment payloads

pub mod api;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod pica;
pub mod store;

pub use enrichment::{derive_id, is_valid_id, EnrichmentRecord, EnrichmentSummary};
pub use error::{Error, Result};
pub use store::{EnrichmentStore, PutOutcome};
