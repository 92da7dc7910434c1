mod common;

use axum::http::StatusCode;
use common::{FixedHealth, RESERVED, TOKEN, ZoneDns, empty_request, json_request, read_json, test_app};
use tower::ServiceExt;

fn app() -> common::TestApp {
    test_app(ZoneDns::default(), FixedHealth::new(200, None, ""))
}

#[tokio::test]
async fn health_carries_the_platform_signature() {
    let response = app()
        .router
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-sms-sites"], "1");
    let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn registration_normalizes_and_rejects_duplicates() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/sites",
            serde_json::json!({ "domain": " WWW.Shop.Example. " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let site = read_json(response).await;
    assert_eq!(site["domain"], "shop.example");
    assert_eq!(site["validation_status"], "pending");
    assert!(site["last_checked_at"].is_null());

    let duplicate = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/sites",
            serde_json::json!({ "domain": "shop.example" }),
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_rejects_bad_hosts() {
    let app = app();
    for domain in ["10.0.0.1", "bad_host.com", "nodot", ""] {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/sites",
                serde_json::json!({ "domain": domain }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{domain}");
    }
}

#[tokio::test]
async fn reserved_site_cannot_be_deleted_or_validated() {
    let app = app();
    let reserved = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/sites/1"))
        .await
        .unwrap();
    assert_eq!(read_json(reserved).await["domain"], RESERVED);

    let delete = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/sites/1"))
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::CONFLICT);

    let validate = app
        .router
        .clone()
        .oneshot(empty_request("POST", "/sites/1/validate"))
        .await
        .unwrap();
    assert_eq!(validate.status(), StatusCode::CONFLICT);
    assert_eq!(read_json(validate).await["code"], "reserved_domain");
}

#[tokio::test]
async fn unknown_site_is_not_found() {
    let app = app();
    for (method, uri) in [("GET", "/sites/99"), ("DELETE", "/sites/99"), ("POST", "/sites/99/validate")] {
        let response = app.router.clone().oneshot(empty_request(method, uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
    }
}

#[tokio::test]
async fn tls_ask_refuses_without_token_or_registration() {
    let app = app();
    let cases = [
        "/tls/ask?domain=example.com".to_string(),
        "/tls/ask?domain=example.com&token=nope".to_string(),
        format!("/tls/ask?domain=example.com&token={TOKEN}"),
        format!("/tls/ask?domain={RESERVED}&token={TOKEN}"),
        format!("/tls/ask?domain=192.0.2.1&token={TOKEN}"),
        format!("/tls/ask?token={TOKEN}"),
    ];
    for uri in cases {
        let response = app.router.clone().oneshot(empty_request("GET", &uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn notices_require_a_session() {
    let response = app()
        .router
        .oneshot(empty_request("GET", "/notices"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_site_loses_certificate_eligibility() {
    let app = app();
    let created = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/sites",
            serde_json::json!({ "domain": "example.com" }),
        ))
        .await
        .unwrap();
    let id = read_json(created).await["id"].as_u64().unwrap();
    let ask = format!("/tls/ask?domain=example.com&token={TOKEN}");

    let allowed = app.router.clone().oneshot(empty_request("GET", &ask)).await.unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    let deleted = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", &format!("/sites/{id}")))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let refused = app.router.clone().oneshot(empty_request("GET", &ask)).await.unwrap();
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
}
