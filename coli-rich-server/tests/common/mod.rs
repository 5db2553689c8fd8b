//! Shared helpers for coli-rich-server integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use coli_rich_common::api::SigningKey;
use coli_rich_common::config::{AllowListSetting, Config, PartialConfig};
use coli_rich_common::EnrichmentStore;
use coli_rich_server::{build_router, AppState};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const LOGIN_PUBLIC_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/login_public.pem"
));
const LOGIN_PRIVATE_PEM: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/login_private.pem"
));
const OTHER_PRIVATE_PEM: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/other_private.pem"
));

pub const ALICE: &str = "https://coli-conc.example/users/alice";
pub const BOB: &str = "https://coli-conc.example/users/bob";

/// Test app backed by a temporary store; the directory lives as long as this value
pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
}

/// Partial config pointing at `dir`, allowing the given users
pub fn partial_config(dir: &TempDir, allowed_users: &str) -> PartialConfig {
    PartialConfig {
        enrichments_path: Some(dir.path().to_path_buf()),
        allowed_users: Some(AllowListSetting::Csv(allowed_users.to_string())),
        ..Default::default()
    }
}

/// App verifying tokens against the fixture login key
pub fn setup_app(allowed_users: &str) -> TestApp {
    let dir = TempDir::new().unwrap();
    let partial = partial_config(&dir, allowed_users);
    setup_app_with(dir, partial, Some(login_key()))
}

pub fn setup_app_with(dir: TempDir, partial: PartialConfig, key: Option<SigningKey>) -> TestApp {
    let config = Config::resolve(partial).unwrap();
    let store = EnrichmentStore::open(&config.enrichments_path).unwrap();
    let router = build_router(AppState::new(config, store, key));
    TestApp { dir, router }
}

pub fn login_key() -> SigningKey {
    SigningKey::new("RS256", LOGIN_PUBLIC_PEM).unwrap()
}

fn sign(user: Value, private_pem: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::RS256),
        &json!({ "user": user, "iat": chrono::Utc::now().timestamp() }),
        &EncodingKey::from_rsa_pem(private_pem).unwrap(),
    )
    .unwrap()
}

/// Token for `uri` signed by the login server
pub fn token_for(uri: &str) -> String {
    sign(json!({ "uri": uri, "name": "Test User" }), LOGIN_PRIVATE_PEM)
}

/// Token for `uri` with linked provider identities
pub fn token_with_providers(uri: &str, providers: &[&str]) -> String {
    let identities: serde_json::Map<String, Value> = providers
        .iter()
        .map(|provider| {
            (
                provider.to_string(),
                json!({ "id": 42, "uri": format!("https://{}.example/{}", provider, 42) }),
            )
        })
        .collect();
    sign(json!({ "uri": uri, "identities": identities }), LOGIN_PRIVATE_PEM)
}

/// Well-formed token signed by a key the server does not trust
pub fn forged_token_for(uri: &str) -> String {
    sign(json!({ "uri": uri }), OTHER_PRIVATE_PEM)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, "localhost:3454")
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, "localhost:3454")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn submit(body: &'static str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/enrichment/")
        .header(header::HOST, "localhost:3454")
        .header(header::CONTENT_TYPE, "text/plain");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).expect("Body should be UTF-8")
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Should parse JSON")
}
