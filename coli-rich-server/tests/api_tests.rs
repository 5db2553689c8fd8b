//! Integration tests for the enrichment endpoints
//!
//! Tests cover:
//! - Submission: 201, content-derived id, Location header, idempotence
//! - Listing: empty store, one line per record with ISO-8601 timestamps
//! - Retrieval: verbatim body, Date header, 404 for unknown and malformed ids
//! - Append-only surface (501 for modification methods)
//! - Health and client configuration endpoints

mod common;

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use chrono::{DateTime, Utc};
use coli_rich_common::derive_id;
use coli_rich_common::config::AllowListSetting;
use coli_rich_server::api::MAX_ENRICHMENT_BYTES;
use common::*;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const PATCH: &str = "  003@ $0123\n+ 045Q/01 $a12.34$Acoli-conc$Ahttps://example.org/mapping/1";

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_scenario() {
    let user = "https://example.org/user/42";
    let app = setup_app(user);

    let response = app
        .router
        .oneshot(submit(PATCH, Some(&token_for(user))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string();

    let body = body_json(response).await;
    let id = derive_id(PATCH.as_bytes());
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["ok"], 1);
    assert_eq!(body["uri"], location.as_str());
    assert_eq!(location, format!("http://localhost:3454/enrichment/{}", id));
}

#[tokio::test]
async fn test_submit_is_idempotent() {
    let app = setup_app(ALICE);
    let token = token_for(ALICE);

    let first = app
        .router
        .clone()
        .oneshot(submit(PATCH, Some(&token)))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body_json(first).await;

    let second = app
        .router
        .clone()
        .oneshot(submit(PATCH, Some(&token)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CREATED);
    let second = body_json(second).await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["uri"], second["uri"]);

    let listing = body_text(app.router.oneshot(get("/enrichment/")).await.unwrap()).await;
    assert_eq!(listing.lines().count(), 1);

    let stored = std::fs::read(app.dir.path().join(first["id"].as_str().unwrap())).unwrap();
    assert_eq!(stored, PATCH.as_bytes());
}

#[tokio::test]
async fn test_submit_without_trailing_slash() {
    let app = setup_app(ALICE);

    let request = Request::builder()
        .method("POST")
        .uri("/enrichment")
        .header(header::HOST, "rich.example")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(ALICE)))
        .body(Body::from(PATCH))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(
        body["uri"],
        format!("http://rich.example/enrichment/{}", derive_id(PATCH.as_bytes())).as_str()
    );
}

#[tokio::test]
async fn test_submit_uses_configured_base_url() {
    let dir = TempDir::new().unwrap();
    let mut partial = partial_config(&dir, ALICE);
    partial.base_url = Some("https://coli-conc.example/rich".to_string());
    let app = setup_app_with(dir, partial, Some(login_key()));

    let response = app
        .router
        .oneshot(submit(PATCH, Some(&token_for(ALICE))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(
        location,
        format!(
            "https://coli-conc.example/rich/enrichment/{}",
            derive_id(PATCH.as_bytes())
        )
    );
}

#[tokio::test]
async fn test_empty_submission_is_stored() {
    let app = setup_app(ALICE);

    let response = app
        .router
        .clone()
        .oneshot(submit("", Some(&token_for(ALICE))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], "da39a3ee5e6b4b0d3255bfef95601890afd80709");

    let response = app
        .router
        .oneshot(get("/enrichment/da39a3ee5e6b4b0d3255bfef95601890afd80709"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_empty_store() {
    let app = setup_app(ALICE);

    let response = app.router.oneshot(get("/enrichment/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_list_after_two_writes() {
    let app = setup_app(ALICE);
    let token = token_for(ALICE);

    for payload in ["  003@ $0111\n", "  003@ $0222\n"] {
        let response = app
            .router
            .clone()
            .oneshot(submit(payload, Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let listing = body_text(app.router.oneshot(get("/enrichment")).await.unwrap()).await;
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines.len(), 2);

    let mut ids = Vec::new();
    for line in lines {
        let (uri, created_at) = line.split_once(' ').expect("uri and timestamp");
        let id = uri
            .strip_prefix("http://localhost:3454/enrichment/")
            .expect("uri under the collection");
        ids.push(id.to_string());
        assert!(DateTime::parse_from_rfc3339(created_at).is_ok(), "{}", created_at);
    }

    ids.sort();
    let mut expected = vec![
        derive_id(b"  003@ $0111\n"),
        derive_id(b"  003@ $0222\n"),
    ];
    expected.sort();
    assert_eq!(ids, expected);
}

// =============================================================================
// Retrieval
// =============================================================================

#[tokio::test]
async fn test_get_returns_content_and_date() {
    let app = setup_app(ALICE);
    let started = Utc::now().timestamp();

    let response = app
        .router
        .clone()
        .oneshot(submit(PATCH, Some(&token_for(ALICE))))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .router
        .oneshot(get(&format!("/enrichment/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let date = response.headers()[header::DATE].to_str().unwrap().to_string();
    let created = DateTime::parse_from_rfc2822(&date).expect("IMF-fixdate");
    assert!(created.timestamp() >= started);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_text(response).await, PATCH);
}

#[tokio::test]
async fn test_get_unknown_id_is_not_found() {
    let app = setup_app(ALICE);

    let response = app
        .router
        .oneshot(get("/enrichment/0000000000000000000000000000000000000000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "EntityNotFoundError");
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_get_malformed_id_is_not_found() {
    let app = setup_app(ALICE);
    std::fs::write(app.dir.path().join("secret.txt"), b"not a record").unwrap();

    for path in [
        "/enrichment/secret.txt",
        "/enrichment/..%2Fetc",
        "/enrichment/a-b",
        "/enrichment/%FF",
        "/enrichment/abc%C3%28",
    ] {
        let response = app.router.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);

        let body = body_json(response).await;
        assert_eq!(body["error"], "EntityNotFoundError", "{}", path);
        assert_eq!(body["status"], 404);
        assert!(body["prefLabel"]["de"].is_string());
    }
}

#[tokio::test]
async fn test_modification_is_not_implemented() {
    let app = setup_app(ALICE);

    for method in ["PUT", "PATCH", "DELETE"] {
        let request = Request::builder()
            .method(method)
            .uri("/enrichment/abc")
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for(ALICE)))
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED, "{}", method);
        let body = body_json(response).await;
        assert_eq!(body["error"], "NotImplementedError");
    }
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_submit_to_unwritable_store_is_backend_error() {
    let app = setup_app(ALICE);
    let root = app.dir.path().to_path_buf();
    std::fs::remove_dir_all(&root).unwrap();

    let response = app
        .router
        .oneshot(submit(PATCH, Some(&token_for(ALICE))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_text(response).await;
    assert!(!text.contains(root.to_str().unwrap()), "{}", text);
    assert!(!text.contains(".incoming-"), "{}", text);

    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error"], "BackendError");
    assert_eq!(body["status"], 500);
    assert_eq!(body["message"], "There was an unknown error with the backend.");
}

#[tokio::test]
async fn test_oversized_submission_is_rejected_as_json() {
    let app = setup_app(ALICE);

    let request = Request::builder()
        .method("POST")
        .uri("/enrichment/")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(ALICE)))
        .body(Body::from(vec![b'x'; MAX_ENRICHMENT_BYTES + 1]))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Error");
    assert_eq!(body["status"], 413);
    assert_eq!(body["message"], "The request body is too large.");
}

#[tokio::test]
async fn test_unsupported_method_is_rejected_as_json() {
    let app = setup_app(ALICE);

    let request = Request::builder()
        .method("POST")
        .uri("/enrichment/abc")
        .header(header::ACCEPT_LANGUAGE, "de")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = response.headers()[header::ALLOW].to_str().unwrap().to_string();
    assert!(allow.contains("GET"), "{}", allow);

    let body = body_json(response).await;
    assert_eq!(body["status"], 405);
    assert_eq!(
        body["message"],
        "Diese Methode wird für die angefragte Ressource nicht unterstützt."
    );
}

// =============================================================================
// Health and configuration
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(ALICE);

    let response = app.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "coli-rich-server");
    assert!(body["version"].is_string());
    assert_eq!(body["authentication"], true);
}

#[tokio::test]
async fn test_client_config_endpoint() {
    let dir = TempDir::new().unwrap();
    let mut partial = partial_config(&dir, &format!("{},{}", ALICE, BOB));
    partial.allowed_providers = Some(AllowListSetting::List(vec!["*".to_string()]));
    partial.login_server = Some("https://login.example".to_string());
    let app = setup_app_with(dir, partial, None);

    let response = app.router.oneshot(get("/config")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["mode"], "development");
    assert_eq!(body["loginServer"], "https://login.example/");
    assert_eq!(body["allowedUsers"], serde_json::json!([ALICE, BOB]));
    assert_eq!(body["allowedProviders"], serde_json::json!(["*"]));
    assert_eq!(body["providerAccess"], false);
}
