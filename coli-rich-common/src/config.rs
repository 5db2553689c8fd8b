//! Configuration model and resolution
//!
//! Settings are resolved once at startup in this priority order:
//! 1. Command-line argument or its environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! The resolved [`Config`] is immutable and handed to every component that
//! needs it; there is no process-wide mutable configuration.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3454;

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Wildcard entry admitting any principal or provider
pub const WILDCARD: &str = "*";

/// Process mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(Error::Config(format!(
                "Unknown mode {:?} (expected development or production)",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

/// Allow-list of principal URIs or provider names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    /// Wildcard `*`: everything matches
    Any,
    /// Explicit entries; empty admits nothing
    Only(BTreeSet<String>),
}

impl Default for AllowList {
    fn default() -> Self {
        AllowList::Only(BTreeSet::new())
    }
}

impl AllowList {
    /// Parse a comma-separated list
    ///
    /// # Examples
    ///
    /// ```
    /// use coli_rich_common::config::AllowList;
    ///
    /// assert_eq!(AllowList::parse("*"), AllowList::Any);
    /// assert!(AllowList::parse(" a , b,,").contains("b"));
    /// assert!(!AllowList::parse("").contains("a"));
    /// ```
    pub fn parse(csv: &str) -> Self {
        Self::from_entries(csv.split(','))
    }

    /// Build from individual entries; blanks are dropped and any `*` makes a wildcard
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry == WILDCARD {
                return AllowList::Any;
            }
            if !entry.is_empty() {
                set.insert(entry.to_string());
            }
        }
        AllowList::Only(set)
    }

    pub fn is_any(&self) -> bool {
        matches!(self, AllowList::Any)
    }

    /// Whether `value` is admitted by this list
    pub fn contains(&self, value: &str) -> bool {
        match self {
            AllowList::Any => true,
            AllowList::Only(set) => set.contains(value),
        }
    }

    /// Entries as published to clients (`["*"]` for the wildcard)
    pub fn entries(&self) -> Vec<String> {
        match self {
            AllowList::Any => vec![WILDCARD.to_string()],
            AllowList::Only(set) => set.iter().cloned().collect(),
        }
    }
}

/// Allow-list as written in a config source: a comma-separated string or a TOML array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AllowListSetting {
    Csv(String),
    List(Vec<String>),
}

impl AllowListSetting {
    fn into_allow_list(self) -> AllowList {
        match self {
            AllowListSetting::Csv(csv) => AllowList::parse(&csv),
            AllowListSetting::List(list) => AllowList::from_entries(list),
        }
    }
}

/// Settings from one source; unset fields fall through to the next source
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub mode: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_url: Option<String>,
    pub login_server: Option<String>,
    pub enrichments_path: Option<PathBuf>,
    pub allowed_users: Option<AllowListSetting>,
    pub allowed_providers: Option<AllowListSetting>,
    pub provider_access: Option<bool>,
    pub static_dir: Option<PathBuf>,
}

impl PartialConfig {
    /// Read settings from a TOML file
    pub fn load_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Field-wise merge where values already set in `self` win over `lower`
    pub fn merge(self, lower: PartialConfig) -> PartialConfig {
        PartialConfig {
            mode: self.mode.or(lower.mode),
            host: self.host.or(lower.host),
            port: self.port.or(lower.port),
            base_url: self.base_url.or(lower.base_url),
            login_server: self.login_server.or(lower.login_server),
            enrichments_path: self.enrichments_path.or(lower.enrichments_path),
            allowed_users: self.allowed_users.or(lower.allowed_users),
            allowed_providers: self.allowed_providers.or(lower.allowed_providers),
            provider_access: self.provider_access.or(lower.provider_access),
            static_dir: self.static_dir.or(lower.static_dir),
        }
    }
}

/// Resolved, immutable service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    /// Public base URL (no trailing slash) used to build record URIs
    pub base_url: Option<String>,
    /// Login server base URL, always ending in `/`
    pub login_server: Option<String>,
    pub enrichments_path: PathBuf,
    pub allowed_users: AllowList,
    pub allowed_providers: AllowList,
    /// Admit principals through `allowed_providers` in addition to `allowed_users`
    pub provider_access: bool,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Apply defaults and validate
    pub fn resolve(partial: PartialConfig) -> Result<Self> {
        let mode = match partial.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => Mode::default(),
        };

        let base_url = partial
            .base_url
            .as_deref()
            .map(|url| normalize_url(url, "base_url"))
            .transpose()?
            .flatten()
            .map(|url| url.trim_end_matches('/').to_string());

        let login_server = partial
            .login_server
            .as_deref()
            .map(|url| normalize_url(url, "login_server"))
            .transpose()?
            .flatten()
            .map(|url| {
                if url.ends_with('/') {
                    url
                } else {
                    format!("{}/", url)
                }
            });

        Ok(Config {
            mode,
            host: partial.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: partial.port.unwrap_or(DEFAULT_PORT),
            base_url,
            login_server,
            enrichments_path: partial
                .enrichments_path
                .unwrap_or_else(default_enrichments_path),
            allowed_users: partial
                .allowed_users
                .map(AllowListSetting::into_allow_list)
                .unwrap_or_default(),
            allowed_providers: partial
                .allowed_providers
                .map(AllowListSetting::into_allow_list)
                .unwrap_or_default(),
            provider_access: partial.provider_access.unwrap_or(false),
            static_dir: partial.static_dir,
        })
    }

    pub fn is_production(&self) -> bool {
        self.mode == Mode::Production
    }
}

/// Trim a URL setting; blank means unset. Only http(s) URLs are accepted.
fn normalize_url(url: &str, key: &str) -> Result<Option<String>> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{} must be an http(s) URL, got {:?}",
            key, url
        )));
    }
    Ok(Some(url.to_string()))
}

/// OS-dependent default storage directory
pub fn default_enrichments_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("coli-rich").join("enrichments"))
        .unwrap_or_else(|| PathBuf::from("./data/enrichments"))
}
