use reqwest::{Method, StatusCode};

use serde_json::json;

use crate::helpers::{json_body, TestApp};

#[tokio::test]
async fn is_present() {
    let app = TestApp::spawn().await;

    let res = app.health_check().await.expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(
        Some("application/json; charset=utf-8"),
        res.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
    );
    assert_eq!(
        json!({ "ok": true, "name": "mahiteklab-api" }),
        json_body(res).await
    );
}

#[tokio::test]
async fn unknown_route_is_a_json_not_found() {
    let app = TestApp::spawn().await;

    for (method, url) in [
        (Method::GET, "nope"),
        (Method::POST, "health"),
        (Method::GET, "subscribe"),
    ] {
        let res = app
            .request(method.clone(), url)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(StatusCode::NOT_FOUND, res.status(), "{} /{}", method, url);
        assert_eq!(json!({ "ok": false, "error": "not_found" }), json_body(res).await);
    }
}
