//! Authentication and authorization primitives
//!
//! Provides the pieces the HTTP layer wraps into its main and optional gates:
//! - Bearer credential extraction and signature verification
//! - Identity context derived from a verified credential
//! - Allow-list access policy
//!
//! # Design Principle
//!
//! This module contains ONLY pure functions and shared types. No HTTP
//! framework dependencies; the server crate adapts these to axum middleware.

pub mod auth;
pub mod types;

pub use auth::{bearer_token, AccessPolicy, AuthContext, SigningKey};
pub use types::{Identity, LoginAbout, ProviderIdentity};
