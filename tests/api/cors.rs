use reqwest::{Method, StatusCode};

use crate::helpers::{TestApp, ALLOWED_ORIGIN};

#[tokio::test]
async fn preflight_from_allowed_origin_is_answered() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::OPTIONS, "subscribe")
        .header("Origin", ALLOWED_ORIGIN)
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NO_CONTENT, res.status());
    let headers = res.headers();
    assert_eq!(ALLOWED_ORIGIN, headers["access-control-allow-origin"]);
    assert_eq!("GET,POST,OPTIONS", headers["access-control-allow-methods"]);
    assert_eq!(
        "content-type, authorization, x-admin-role",
        headers["access-control-allow-headers"]
    );
    assert_eq!("86400", headers["access-control-max-age"]);
    assert_eq!("Origin", headers["vary"]);
}

#[tokio::test]
async fn preflight_from_other_origin_has_no_cors_headers() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::OPTIONS, "admin/campaigns")
        .header("Origin", "https://evil.example")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NO_CONTENT, res.status());
    assert!(res.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn responses_echo_allowed_origin() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "health")
        .header("Origin", ALLOWED_ORIGIN)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(ALLOWED_ORIGIN, res.headers()["access-control-allow-origin"]);

    let res = app
        .request(Method::GET, "does-not-exist")
        .header("Origin", ALLOWED_ORIGIN)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
    assert_eq!(ALLOWED_ORIGIN, res.headers()["access-control-allow-origin"]);
}

#[tokio::test]
async fn responses_to_other_origins_are_not_decorated() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "health")
        .header("Origin", "https://evil.example")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert!(res.headers().get("access-control-allow-origin").is_none());
}
