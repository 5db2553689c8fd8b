//! Filesystem-backed enrichment store
//!
//! One file per record inside the store directory: the file name is the
//! record's identifier, the file content is the submitted payload verbatim
//! and the file's birth time is the record's creation time.
//!
//! Records are write-once. New content is staged in a hidden temporary file
//! and linked into place without clobbering, so readers never observe a
//! partially written record and two concurrent writers of the same payload
//! both succeed.

use std::fs::{self, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::enrichment::{is_valid_id, EnrichmentRecord, EnrichmentSummary};
use crate::{Error, Result};

/// Prefix of staging files; the leading dot keeps them out of listings
const STAGING_PREFIX: &str = ".incoming-";

/// Result of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The record was written by this call
    Created,
    /// A record with this id was already stored; nothing was written
    Existing,
}

/// Write-once store of enrichment records
#[derive(Debug, Clone)]
pub struct EnrichmentStore {
    root: PathBuf,
}

impl EnrichmentStore {
    /// Open the store, creating its directory if missing
    ///
    /// Fails when the directory cannot be created or the path exists but is
    /// not a directory. Callers treat this as fatal at startup.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.exists() {
            info!("Creating enrichment directory: {}", root.display());
            fs::create_dir_all(&root)?;
        }

        if !root.is_dir() {
            return Err(Error::Config(format!(
                "Enrichment path is not a directory: {}",
                root.display()
            )));
        }

        Ok(Self { root })
    }

    /// Directory holding the records
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `content` under `id` unless a record with that id already exists
    pub fn put(&self, id: &str, content: &[u8]) -> Result<PutOutcome> {
        if !is_valid_id(id) {
            return Err(Error::InvalidId(id.to_string()));
        }

        let target = self.root.join(id);
        if target.exists() {
            debug!("Enrichment {} already stored", id);
            return Ok(PutOutcome::Existing);
        }

        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.root)?;
        staged.write_all(content)?;
        staged.as_file().sync_all()?;

        match staged.persist_noclobber(&target) {
            Ok(_) => {
                debug!("Stored enrichment {} ({} bytes)", id, content.len());
                Ok(PutOutcome::Created)
            }
            // Lost a race against an identical submission; the staged file is
            // removed when the error is dropped.
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(PutOutcome::Existing),
            Err(e) => Err(Error::Io(e.error)),
        }
    }

    /// Fetch a record with its payload
    pub fn get(&self, id: &str) -> Result<EnrichmentRecord> {
        if !is_valid_id(id) {
            return Err(Error::InvalidId(id.to_string()));
        }

        let path = self.root.join(id);
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(Error::NotFound(id.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(id.to_string()))
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let content = fs::read(&path)?;

        Ok(EnrichmentRecord {
            id: id.to_string(),
            content,
            created_at: created_at(&metadata)?,
        })
    }

    /// Enumerate stored records, oldest first
    ///
    /// Entries that are not regular files or whose names are not valid ids
    /// (staging files, stray subdirectories) are skipped.
    pub fn list(&self) -> Result<Vec<EnrichmentSummary>> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_valid_id(&id) {
                continue;
            }

            // DirEntry::metadata does not follow symlinks
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping enrichment {}: {}", id, e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            entries.push(EnrichmentSummary {
                id,
                created_at: created_at(&metadata)?,
            });
        }

        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }
}

/// Birth time, or modification time where the filesystem does not record it
fn created_at(metadata: &Metadata) -> Result<DateTime<Utc>> {
    let time = metadata.created().or_else(|_| metadata.modified())?;
    Ok(DateTime::<Utc>::from(time))
}
