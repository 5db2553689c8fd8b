//! Integration tests for login-server key discovery
//!
//! Each test serves a fake `/about` document on an ephemeral port.

mod common;

use axum::{routing::get, Json, Router};
use coli_rich_server::login::discover_signing_key;
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};

/// Serve `about` at `/about` and return the login server base URL
async fn spawn_login_server(about: Value) -> String {
    let app = Router::new().route("/about", get(move || async move { Json(about) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn test_discovers_rsa_key() {
    let login = spawn_login_server(json!({
        "algorithm": "RS256",
        "publicKey": common::LOGIN_PUBLIC_PEM,
        "strategies": ["github", "orcid"],
    }))
    .await;

    let key = discover_signing_key(&login).await.expect("key should be discovered");
    assert_eq!(key.algorithm(), Algorithm::RS256);

    let identity = key.verify(&common::token_for(common::ALICE)).unwrap();
    assert_eq!(identity.uri.as_deref(), Some(common::ALICE));
}

#[tokio::test]
async fn test_missing_fields_disable_authentication() {
    let login = spawn_login_server(json!({ "algorithm": "RS256" })).await;
    assert!(discover_signing_key(&login).await.is_none());

    let login = spawn_login_server(json!({ "publicKey": common::LOGIN_PUBLIC_PEM })).await;
    assert!(discover_signing_key(&login).await.is_none());
}

#[tokio::test]
async fn test_malformed_key_disables_authentication() {
    let login = spawn_login_server(json!({
        "algorithm": "RS256",
        "publicKey": "-----BEGIN PUBLIC KEY-----\nnot base64\n-----END PUBLIC KEY-----",
    }))
    .await;

    assert!(discover_signing_key(&login).await.is_none());
}

#[tokio::test]
async fn test_unknown_algorithm_disables_authentication() {
    let login = spawn_login_server(json!({
        "algorithm": "XS999",
        "publicKey": common::LOGIN_PUBLIC_PEM,
    }))
    .await;

    assert!(discover_signing_key(&login).await.is_none());
}

#[tokio::test]
async fn test_unreachable_login_server_disables_authentication() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(discover_signing_key(&format!("http://{}/", addr)).await.is_none());
}

#[tokio::test]
async fn test_non_json_about_disables_authentication() {
    let app = Router::new().route("/about", get(|| async { "login server" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    assert!(discover_signing_key(&format!("http://{}/", addr)).await.is_none());
}
