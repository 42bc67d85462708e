use reqwest::StatusCode;

use serde_json::json;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use mahiteklab_api::domain::EventKind;

use crate::helpers::{email_links, json_body, TestApp, TestOptions, PUBLIC_URL};

#[tokio::test]
async fn subscribe_issues_welcome_coupon_and_sends_email() {
    let app = TestApp::spawn().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .and(header("X-Postmark-Server-Token", "TestAuthorization"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .subscribe(&json!({ "email": "a@b.com" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(json!({ "ok": true, "emailSent": true }), json_body(res).await);

    let coupons = app.store.coupons_for("a@b.com").await;
    assert_eq!(1, coupons.len());
    assert_eq!("WELCOME", coupons[0].campaign_id);
    assert_eq!("WELCOME-EBC0ED6531", coupons[0].code);

    let requests = app.email_server.received_requests().await.unwrap();
    let email: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!("a@b.com", email["To"]);
    assert!(email["TextBody"]
        .as_str()
        .unwrap()
        .contains("WELCOME-EBC0ED6531"));
    assert_eq!(vec![PUBLIC_URL.to_string()], email_links(&requests[0]));
}

#[tokio::test]
async fn resubscribing_is_idempotent() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;

    for _ in 0..3 {
        let res = app
            .subscribe(&json!({ "email": "a@b.com" }))
            .await
            .expect("Failed to execute request");
        assert_eq!(StatusCode::OK, res.status());
    }

    let coupons = app.store.coupons_for("a@b.com").await;
    assert_eq!(1, coupons.len());
    assert_eq!("WELCOME-EBC0ED6531", coupons[0].code);

    // Every request re-sends the existing code
    let requests = app.email_server.received_requests().await.unwrap();
    assert_eq!(3, requests.len());
    for request in &requests {
        let email: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert!(email["HtmlBody"]
            .as_str()
            .unwrap()
            .contains("WELCOME-EBC0ED6531"));
    }
}

#[tokio::test]
async fn email_is_normalized_before_use() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;

    let res = app
        .subscribe(&json!({ "email": "  A@B.Com " }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert!(app.store.subscriber("a@b.com").await.is_some());
    assert_eq!(
        "WELCOME-EBC0ED6531",
        app.store.coupons_for("a@b.com").await[0].code
    );
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = TestApp::spawn().await;

    let test_cases = vec![
        (json!({}), "missing email"),
        (json!({ "email": "" }), "empty email"),
        (json!({ "email": "not-an-email" }), "no at sign"),
        (json!({ "email": "a@b" }), "no domain dot"),
        (json!({ "email": "a b@c.com" }), "whitespace"),
    ];

    for (body, desc) in test_cases {
        let res = app.subscribe(&body).await.expect("Failed to execute request");

        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "{}", desc);
        assert_eq!(
            json!({ "ok": false, "error": "invalid_email" }),
            json_body(res).await,
            "{}",
            desc
        );
    }

    assert!(app.store.events().await.is_empty());
}

#[tokio::test]
async fn malformed_body_is_invalid_json() {
    let app = TestApp::spawn().await;

    for body in ["not json", "[1, 2]", "\"a@b.com\"", ""] {
        let res = app
            .request(reqwest::Method::POST, "subscribe")
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "body: {:?}", body);
        assert_eq!(
            json!({ "ok": false, "error": "invalid_json" }),
            json_body(res).await
        );
    }
}

#[tokio::test]
async fn subscriber_attributes_are_first_write_wins() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;

    app.request(reqwest::Method::POST, "subscribe")
        .header("CF-IPCountry", "NZ")
        .header("User-Agent", "first-agent")
        .json(&json!({ "email": "a@b.com", "source": "instagram" }))
        .send()
        .await
        .expect("Failed to execute request");
    app.request(reqwest::Method::POST, "subscribe")
        .header("CF-IPCountry", "AU")
        .header("CF-IPCity", "Sydney")
        .header("User-Agent", "second-agent")
        .json(&json!({
            "email": "a@b.com",
            "source": "tiktok",
            "referrer": "https://example.com/post",
            "landingPath": "/shop"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    let subscriber = app.store.subscriber("a@b.com").await.unwrap();
    let attributes = subscriber.attributes;
    assert_eq!(Some("instagram"), attributes.source.as_deref());
    assert_eq!(Some("NZ"), attributes.country.as_deref());
    assert_eq!(Some("first-agent"), attributes.user_agent.as_deref());
    assert_eq!(Some("https://example.com/post"), attributes.referrer.as_deref());
    assert_eq!(Some("/shop"), attributes.landing_path.as_deref());
    assert_eq!(Some("Sydney"), attributes.city.as_deref());
}

#[tokio::test]
async fn active_requested_campaign_issues_second_coupon() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.add_summer_campaign(-1, 1).await;

    let res = app
        .subscribe(&json!({ "email": "a@b.com", "campaignId": "summer25" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let codes: Vec<_> = app
        .store
        .coupons_for("a@b.com")
        .await
        .into_iter()
        .map(|c| (c.campaign_id, c.code))
        .collect();
    assert_eq!(
        vec![
            ("SUMMER25".to_string(), "SUMMER-4E8186B58A".to_string()),
            ("WELCOME".to_string(), "WELCOME-EBC0ED6531".to_string()),
        ],
        codes
    );

    let requests = app.email_server.received_requests().await.unwrap();
    let email: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!("Your MahiTek Lab coupons", email["Subject"]);

    let events = app.store.events().await;
    let issued = events
        .iter()
        .find(|e| e.kind == EventKind::CouponIssued)
        .unwrap();
    assert_eq!(Some("SUMMER25"), issued.campaign_id.as_deref());
}

#[tokio::test]
async fn campaign_outside_its_window_falls_back_to_welcome() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.add_summer_campaign(-10, -1).await;

    let test_cases = vec![
        (json!({ "email": "a@b.com", "campaignId": "SUMMER25" }), "expired"),
        (json!({ "email": "b@b.com", "campaignId": "AUTUMN" }), "unknown"),
        (json!({ "email": "c@b.com", "campaignId": "not valid!" }), "malformed"),
        (json!({ "email": "d@b.com", "campaignId": "welcome" }), "welcome"),
    ];

    for (body, desc) in test_cases {
        let email = body["email"].as_str().unwrap().to_string();
        let res = app.subscribe(&body).await.expect("Failed to execute request");

        assert_eq!(StatusCode::OK, res.status(), "{}", desc);
        assert_eq!(
            json!({ "ok": true, "emailSent": true }),
            json_body(res).await,
            "{}",
            desc
        );
        let coupons = app.store.coupons_for(&email).await;
        assert_eq!(1, coupons.len(), "{}", desc);
        assert_eq!("WELCOME", coupons[0].campaign_id, "{}", desc);
    }
}

#[tokio::test]
async fn non_string_fields_are_ignored() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.add_summer_campaign(-1, 1).await;

    let test_cases = vec![
        (json!({ "email": "a@b.com", "campaignId": 123 }), "numeric campaign"),
        (json!({ "email": "b@b.com", "campaignId": ["SUMMER25"] }), "array campaign"),
        (json!({ "email": "c@b.com", "source": 7, "landingPath": {} }), "attribution"),
    ];

    for (body, desc) in test_cases {
        let email = body["email"].as_str().unwrap().to_string();
        let res = app.subscribe(&body).await.expect("Failed to execute request");

        assert_eq!(StatusCode::OK, res.status(), "{}", desc);
        assert_eq!(
            json!({ "ok": true, "emailSent": true }),
            json_body(res).await,
            "{}",
            desc
        );
        let coupons = app.store.coupons_for(&email).await;
        assert_eq!(1, coupons.len(), "{}", desc);
        assert_eq!("WELCOME", coupons[0].campaign_id, "{}", desc);
    }

    let subscriber = app.store.subscriber("c@b.com").await.unwrap();
    assert_eq!(None, subscriber.attributes.source);
}

#[tokio::test]
async fn non_string_email_is_invalid_email() {
    let app = TestApp::spawn().await;

    let res = app
        .subscribe(&json!({ "email": 42 }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!(
        json!({ "ok": false, "error": "invalid_email" }),
        json_body(res).await
    );
}

#[tokio::test]
async fn inactive_campaign_is_ignored() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    app.add_campaign(json!({
        "id": "PAUSED",
        "name": "Paused",
        "prefix": "PAUSED",
        "discountType": "amount",
        "discountValue": 5,
        "active": false,
    }))
    .await;

    app.subscribe(&json!({ "email": "a@b.com", "campaignId": "PAUSED" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(1, app.store.coupons_for("a@b.com").await.len());
}

#[tokio::test]
async fn email_failure_still_succeeds() {
    let app = TestApp::spawn().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .subscribe(&json!({ "email": "a@b.com" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(json!({ "ok": true, "emailSent": false }), json_body(res).await);
    assert_eq!(1, app.store.coupons_for("a@b.com").await.len());
}

#[tokio::test]
async fn missing_welcome_campaign_is_a_server_error() {
    let app = TestApp::spawn_with(TestOptions {
        seeded: false,
        ..Default::default()
    })
    .await;

    let res = app
        .subscribe(&json!({ "email": "a@b.com" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, res.status());
    assert_eq!(
        json!({ "ok": false, "error": "missing_welcome_campaign" }),
        json_body(res).await
    );
    assert!(app.store.coupons_for("a@b.com").await.is_empty());
}

#[tokio::test]
async fn challenge_token_is_required_when_enabled() {
    let app = TestApp::spawn_with(TestOptions {
        turnstile_secret: Some("turnstile-secret"),
        ..Default::default()
    })
    .await;

    let res = app
        .subscribe(&json!({ "email": "a@b.com" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!(
        json!({ "ok": false, "error": "missing_turnstile_token" }),
        json_body(res).await
    );
    assert!(app.store.subscriber("a@b.com").await.is_none());
}

#[tokio::test]
async fn rejected_challenge_token_fails() {
    let app = TestApp::spawn_with(TestOptions {
        turnstile_secret: Some("turnstile-secret"),
        ..Default::default()
    })
    .await;

    Mock::given(path("/siteverify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error-codes": ["invalid-input-response"],
        })))
        .mount(&app.turnstile_server)
        .await;

    let res = app
        .subscribe(&json!({ "email": "a@b.com", "turnstileToken": "bogus" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert_eq!(
        json!({ "ok": false, "error": "turnstile_failed" }),
        json_body(res).await
    );
    assert!(app.store.coupons_for("a@b.com").await.is_empty());
}

#[tokio::test]
async fn accepted_challenge_token_passes_client_ip() {
    let app = TestApp::spawn_with(TestOptions {
        turnstile_secret: Some("turnstile-secret"),
        ..Default::default()
    })
    .await;
    app.accept_emails().await;

    Mock::given(path("/siteverify"))
        .and(method("POST"))
        .and(body_string_contains("secret=turnstile-secret"))
        .and(body_string_contains("response=good-token"))
        .and(body_string_contains("remoteip=203.0.113.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.turnstile_server)
        .await;

    let res = app
        .request(reqwest::Method::POST, "subscribe")
        .header("CF-Connecting-IP", "203.0.113.7")
        .json(&json!({ "email": "a@b.com", "turnstileToken": "good-token" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let events = app.store.events().await;
    assert!(events
        .iter()
        .all(|e| e.ip.as_deref() == Some("203.0.113.7")));
}

#[tokio::test]
async fn unreachable_challenge_service_is_a_server_error() {
    let app = TestApp::spawn_with(TestOptions {
        turnstile_secret: Some("turnstile-secret"),
        ..Default::default()
    })
    .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.turnstile_server)
        .await;

    let res = app
        .subscribe(&json!({ "email": "a@b.com", "turnstileToken": "token" }))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, res.status());
    assert_eq!(
        json!({ "ok": false, "error": "server_error" }),
        json_body(res).await
    );
}
