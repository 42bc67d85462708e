use std::future::Future;
use std::net::TcpListener;
use std::pin::Pin;
use std::sync::Arc;

use actix_web::dev::{Server, Service, ServiceRequest, ServiceResponse};
use actix_web::http::{Method, StatusCode};
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use anyhow::Context;

use serde_json::json;

use tracing_actix_web::TracingLogger;

use crate::auth::AdminTokens;
use crate::client::TurnstileClient;
use crate::controller::{self, json_response};
use crate::cors::CorsPolicy;
use crate::crypto::CouponSecret;
use crate::error::{ApiError, ApiResult};
use crate::repo::Store;
use crate::service::Notifier;
use crate::settings::Settings;

/// Name reported by the health endpoint
pub const SERVICE_NAME: &str = "mahiteklab-api";

/// Everything a request handler may depend on, built once at startup
pub struct Services {
    pub store: Arc<dyn Store>,
    pub challenge: TurnstileClient,
    pub coupon_secret: CouponSecret,
    pub notifier: Notifier,
    pub admin_tokens: AdminTokens,
    pub cors: CorsPolicy,
}

impl Services {
    /// Wire up the outbound clients described by the settings around a store
    pub fn from_settings(settings: &Settings, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let coupon_secret = CouponSecret::new(settings.coupons.signing_secret.clone());
        if !coupon_secret.is_configured() {
            tracing::warn!("Coupon signing secret is not set; subscriptions will fail");
        }

        let challenge = settings.turnstile.client()?;
        if !challenge.is_enabled() {
            tracing::warn!("Bot-challenge secret is not set; verification is disabled");
        }

        let notifier = Notifier::new(settings.email.sender_client()?, settings.app.public_url()?);

        Ok(Self {
            store,
            challenge,
            coupon_secret,
            notifier,
            admin_tokens: settings.admin.tokens()?,
            cors: CorsPolicy::new(settings.cors.allowed_origins.clone()),
        })
    }
}

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health")]
async fn health_check() -> impl Responder {
    json_response(StatusCode::OK, &json!({ "ok": true, "name": SERVICE_NAME }))
}

async fn not_found() -> ApiResult<HttpResponse> {
    Err(ApiError::NotFound)
}

type CorsFuture = Pin<Box<dyn Future<Output = Result<ServiceResponse, actix_web::Error>>>>;

/// Answer preflight requests directly and decorate every other response
fn handle_cors<S>(cors: &CorsPolicy, req: ServiceRequest, srv: &S) -> CorsFuture
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = actix_web::Error>,
    S::Future: 'static,
{
    let origin = cors.allowed_origin(req.headers());

    if req.method() == Method::OPTIONS {
        let res = req.into_response(cors.preflight(origin));
        return Box::pin(async move { Ok(res) });
    }

    let fut = srv.call(req);
    Box::pin(async move {
        let mut res = fut.await?;
        if let Some(origin) = origin {
            CorsPolicy::apply(res.headers_mut(), origin);
        }
        Ok(res)
    })
}

/// Run the application on a specified TCP listener
pub fn run(listener: TcpListener, services: Services) -> anyhow::Result<Server> {
    // Wrap application data
    let store = web::Data::from(services.store);
    let challenge = web::Data::new(services.challenge);
    let coupon_secret = web::Data::new(services.coupon_secret);
    let notifier = web::Data::new(services.notifier);
    let admin_tokens = web::Data::new(services.admin_tokens);
    let cors = Arc::new(services.cors);

    // Start the server
    let server = HttpServer::new(move || {
        let cors = cors.clone();
        App::new()
            .wrap_fn(move |req, srv| handle_cors(&cors, req, srv))
            .wrap(TracingLogger::default())
            .app_data(store.clone())
            .app_data(challenge.clone())
            .app_data(coupon_secret.clone())
            .app_data(notifier.clone())
            .app_data(admin_tokens.clone())
            .service(health_check)
            .service(controller::subscribe)
            .service(controller::admin_scope())
            .default_service(web::to(not_found))
    })
    .listen(listener)
    .context("Failed to listen on TCP listener")?
    .run();

    Ok(server)
}
