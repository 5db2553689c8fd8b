//! Shared identity and login-server types

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::api::auth::SigningKey;
use crate::{Error, Result};

/// Authenticated principal as carried in a login-server credential
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Canonical URI of the principal
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// Linked identities keyed by provider name (e.g. `github`, `orcid`)
    #[serde(default)]
    pub identities: BTreeMap<String, ProviderIdentity>,
}

/// Identity of the principal at one linked provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Provider-specific account id; some providers issue numeric ids
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,

    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

/// Signing metadata published by the login server at `{login}about`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginAbout {
    #[serde(default)]
    pub algorithm: Option<String>,

    #[serde(default, rename = "publicKey")]
    pub public_key: Option<String>,
}

impl LoginAbout {
    /// Build the verification key; both fields are required
    pub fn into_signing_key(self) -> Result<SigningKey> {
        match (self.algorithm, self.public_key) {
            (Some(algorithm), Some(public_key))
                if !algorithm.is_empty() && !public_key.is_empty() =>
            {
                SigningKey::new(&algorithm, &public_key)
            }
            _ => Err(Error::Config(
                "/about did not return required `algorithm` and `publicKey` fields".to_string(),
            )),
        }
    }
}
