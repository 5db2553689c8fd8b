//! Credential verification and access policy
//!
//! Credentials are JWTs issued by an external login server. The server
//! publishes its algorithm and public key once; every token is verified
//! against that key and must carry a `user` claim describing the principal.
//!
//! Access is granted by allow-lists of principal URIs and, when enabled,
//! provider names. The two checks combine as an explicit OR.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::api::types::Identity;
use crate::config::{AllowList, Config};
use crate::{Error, Result};

// ========================================
// Bearer Extraction
// ========================================

/// Extract the token from an `Authorization` header value
///
/// The scheme is matched case-insensitively; anything but exactly
/// `<scheme> <token>` yields `None`.
///
/// # Examples
///
/// ```
/// use coli_rich_common::api::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(bearer_token("bearer abc"), Some("abc"));
/// assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
/// ```
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

// ========================================
// Signing Key
// ========================================

/// Payload of a login-server credential
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    user: Option<Identity>,
}

/// Verification key published by the login server
#[derive(Clone)]
pub struct SigningKey {
    algorithm: Algorithm,
    key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Build a key from an algorithm name (`RS256`, `ES256`, `EdDSA`, `HS256`, ...)
    /// and the published key material
    ///
    /// Asymmetric algorithms expect a PEM public key; `HS*` uses the raw bytes
    /// as shared secret.
    pub fn new(algorithm: &str, public_key: &str) -> Result<Self> {
        let algorithm = Algorithm::from_str(algorithm.trim()).map_err(|_| {
            Error::Config(format!("Unsupported signing algorithm {:?}", algorithm))
        })?;

        let pem = public_key.as_bytes();
        let key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => DecodingKey::from_secret(pem),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem)
                .map_err(|e| Error::Config(format!("Invalid RSA public key: {}", e)))?,
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem)
                .map_err(|e| Error::Config(format!("Invalid EC public key: {}", e)))?,
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem)
                .map_err(|e| Error::Config(format!("Invalid Ed25519 public key: {}", e)))?,
        };

        Ok(Self { algorithm, key })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Verify a token and return the principal it describes
    ///
    /// `exp` and `nbf` are enforced when present; no claim is mandatory.
    /// A valid signature without a `user` claim is rejected.
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let mut validation = Validation::new(self.algorithm);
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;
        validation.validate_nbf = true;

        let data = decode::<Claims>(token, &self.key, &validation)
            .map_err(|e| Error::Credential(e.to_string()))?;

        data.claims
            .user
            .ok_or_else(|| Error::Credential("Token carries no user".to_string()))
    }
}

// ========================================
// Identity Context
// ========================================

/// Identity context attached to every request passing through a gate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// Verified principal; `None` for anonymous requests
    pub user: Option<Identity>,
    /// Principal URI plus every linked-provider URI, deduplicated
    pub uris: Vec<String>,
    /// Names of linked providers
    pub user_providers: Vec<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_identity(identity: Identity) -> Self {
        let mut uris: Vec<String> = Vec::new();
        let candidates = std::iter::once(identity.uri.as_ref())
            .chain(identity.identities.values().map(|linked| linked.uri.as_ref()));
        for uri in candidates.flatten() {
            if !uri.is_empty() && !uris.contains(uri) {
                uris.push(uri.clone());
            }
        }

        let user_providers = identity.identities.keys().cloned().collect();

        Self {
            user: Some(identity),
            uris,
            user_providers,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

// ========================================
// Access Policy
// ========================================

/// Allow-list policy deciding whether a verified principal may write
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub allowed_users: AllowList,
    pub allowed_providers: AllowList,
    /// When false only `allowed_users` is consulted
    pub provider_access: bool,
}

impl AccessPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allowed_users: config.allowed_users.clone(),
            allowed_providers: config.allowed_providers.clone(),
            provider_access: config.provider_access,
        }
    }

    /// `users_admit || (provider_access && providers_admit)`
    pub fn admits(&self, identity: &Identity) -> bool {
        self.admits_user(identity) || (self.provider_access && self.admits_provider(identity))
    }

    /// Wildcard, or the principal URI is listed
    pub fn admits_user(&self, identity: &Identity) -> bool {
        match &self.allowed_users {
            AllowList::Any => true,
            AllowList::Only(_) => identity
                .uri
                .as_deref()
                .is_some_and(|uri| self.allowed_users.contains(uri)),
        }
    }

    /// Some linked provider with a non-empty account id is allowed
    pub fn admits_provider(&self, identity: &Identity) -> bool {
        identity.identities.iter().any(|(provider, linked)| {
            linked.id.as_deref().is_some_and(|id| !id.is_empty())
                && self.allowed_providers.contains(provider)
        })
    }
}
