//! HTTP route tests, driven through the router without a socket

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use traxx::auth::{unix_now, SigningContext, StreamKeyAuthority};
use traxx::server::{create_router, AppState, USER_ID_HEADER};

const TEST_SECRET: &[u8] = b"test-secret-for-http-tests";

fn authority() -> StreamKeyAuthority {
    StreamKeyAuthority::new(SigningContext::new(TEST_SECRET))
}

fn app() -> Router {
    create_router(AppState::new(authority()))
}

fn post_json(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_issue_returns_key_for_caller() {
    let (status, body) = send(app(), post_json("/api/streams/key", Some("123"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let key = body["streamKey"].as_str().unwrap();
    assert!(key.starts_with("123:"));
    assert!(authority().verify(key, 123));
}

#[tokio::test]
async fn test_issue_requires_user() {
    let (status, body) = send(app(), post_json("/api/streams/key", None, json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let (status, _) = send(app(), post_json("/api/streams/key", Some("0"), json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app(), post_json("/api/streams/key", Some("abc"), json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validate_own_key() {
    let key = authority().issue(123).to_string();
    let (status, body) = send(
        app(),
        post_json("/api/streams/key/validate", Some("123"), json!({ "streamKey": key })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "isValid": true }));
}

#[tokio::test]
async fn test_validate_malformed_key_is_bad_request() {
    let (status, body) = send(
        app(),
        post_json(
            "/api/streams/key/validate",
            Some("123"),
            json!({ "streamKey": "123:badtimestamp:xyz" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "isValid": false, "error": "Invalid stream key format" }));
}

#[tokio::test]
async fn test_validate_missing_key_is_bad_request() {
    let (status, body) = send(
        app(),
        post_json("/api/streams/key/validate", Some("123"), json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isValid"], false);
}

#[tokio::test]
async fn test_validate_failures_are_indistinguishable() {
    let auth = authority();
    let other_user = auth.issue(456).to_string();
    let expired = auth.issue_at(123, unix_now() - 2 * 86_400).to_string();
    let forged = format!("123:{}:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA", unix_now());

    for key in [other_user, expired, forged] {
        let (status, body) = send(
            app(),
            post_json("/api/streams/key/validate", Some("123"), json!({ "streamKey": key })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "isValid": false }));
    }
}

#[tokio::test]
async fn test_validate_requires_user() {
    let key = authority().issue(123).to_string();
    let (status, _) = send(
        app(),
        post_json("/api/streams/key/validate", None, json!({ "streamKey": key })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validate_non_string_key_is_bad_request() {
    for body in [json!({ "streamKey": 123 }), json!({ "streamKey": null }), json!([1, 2])] {
        let (status, body) = send(
            app(),
            post_json("/api/streams/key/validate", Some("123"), body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "isValid": false, "error": "Invalid stream key format" }));
    }
}

#[tokio::test]
async fn test_validate_unreadable_body_is_bad_request() {
    let not_json = Request::builder()
        .method("POST")
        .uri("/api/streams/key/validate")
        .header("content-type", "application/json")
        .header(USER_ID_HEADER, "123")
        .body(Body::from("not json"))
        .unwrap();

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/api/streams/key/validate")
        .header(USER_ID_HEADER, "123")
        .body(Body::from(r#"{"streamKey":"1:2:sig"}"#))
        .unwrap();

    for req in [not_json, no_content_type] {
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "isValid": false, "error": "Invalid stream key format" }));
    }
}

#[tokio::test]
async fn test_padded_user_id_is_rejected() {
    for user in [" 123", "123 ", "+123"] {
        let (status, _) = send(app(), post_json("/api/streams/key", Some(user), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "user header {:?}", user);
    }
}
