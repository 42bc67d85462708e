use actix_web::http::StatusCode;
use actix_web::{post, web, HttpResponse};

use chrono::Utc;

use serde::Serialize;

use crate::client::TurnstileClient;
use crate::controller::{json_response, parse_json_object, ClientContext};
use crate::crypto::CouponSecret;
use crate::domain::EmailAddress;
use crate::error::{ApiError, ApiResult};
use crate::repo::Store;
use crate::service::{Notifier, SubscribeBody, SubscribeRequest, SubscriptionService};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeResponse {
    ok: bool,
    email_sent: bool,
}

impl SubscribeRequest {
    /// Validate a parsed body against the caller's context
    fn from_body(body: SubscribeBody, client: &ClientContext) -> ApiResult<Self> {
        let email: EmailAddress = body
            .email
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|_| ApiError::InvalidEmail)?;

        let attributes = client.attributes(
            body.source.as_deref(),
            body.referrer.as_deref(),
            body.landing_path.as_deref(),
        );

        Ok(Self {
            email,
            turnstile_token: body.turnstile_token,
            campaign_id: body.campaign_id,
            attributes,
            ip: client.ip.clone(),
        })
    }
}

/// Subscribe an email address and issue its coupons
#[tracing::instrument(
    name = "Subscribe",
    skip(body, client, store, challenge, coupon_secret, notifier),
    fields(client_ip = ?client.ip)
)]
#[post("/subscribe")]
pub async fn subscribe(
    body: web::Bytes,
    client: ClientContext,
    store: web::Data<dyn Store>,
    challenge: web::Data<TurnstileClient>,
    coupon_secret: web::Data<CouponSecret>,
    notifier: web::Data<Notifier>,
) -> ApiResult<HttpResponse> {
    let body: SubscribeBody = parse_json_object(&body)?;
    let request = SubscribeRequest::from_body(body, &client)?;

    let service = SubscriptionService {
        store: store.get_ref(),
        challenge: challenge.get_ref(),
        coupon_secret: coupon_secret.get_ref(),
        notifier: notifier.get_ref(),
    };
    let outcome = service.subscribe(request, Utc::now()).await?;

    Ok(json_response(
        StatusCode::OK,
        &SubscribeResponse {
            ok: true,
            email_sent: outcome.email_sent,
        },
    ))
}
