//! Enrichment records and their content-derived identifiers
//!
//! An enrichment is an opaque PICA patch submitted for one catalog record.
//! Its identifier is the SHA-1 digest of the raw payload, rendered as 40
//! lowercase hex characters. Identical payloads always share an identifier,
//! which is what makes the store's write path idempotent.

use chrono::{DateTime, SecondsFormat, Utc};
use sha1::{Digest, Sha1};

/// Length of an identifier produced by [`derive_id`]
pub const ID_LENGTH: usize = 40;

/// Derive the identifier of an enrichment payload
///
/// # Examples
///
/// ```
/// use coli_rich_common::derive_id;
///
/// let id = derive_id(b"  003@ $0123\n");
/// assert_eq!(id.len(), 40);
/// assert_eq!(id, derive_id(b"  003@ $0123\n"));
/// ```
pub fn derive_id(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Check that an identifier is safe to use as a file name
///
/// Only non-empty ASCII alphanumeric strings are accepted; this is checked
/// before any storage access so that `..` or separators never reach the filesystem.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// A stored enrichment with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRecord {
    pub id: String,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Listing entry for a stored enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl EnrichmentSummary {
    /// Creation time as millisecond-precision ISO-8601 in UTC (`2024-05-01T10:00:00.000Z`)
    pub fn created_at_iso(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
