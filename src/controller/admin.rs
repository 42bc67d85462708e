use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse};

use serde::Serialize;

use serde_json::json;

use crate::auth::Administrator;
use crate::controller::{json_response, parse_json_object, ClientContext};
use crate::domain::{Campaign, CampaignDraft, CampaignForm, EventKind, NewEvent};
use crate::error::ApiResult;
use crate::repo::{Stats, Store};
use crate::service::record_event_best_effort;

#[derive(Serialize)]
struct CampaignsResponse {
    ok: bool,
    campaigns: Vec<Campaign>,
}

#[derive(Serialize)]
struct StatsResponse {
    ok: bool,
    stats: Stats,
}

#[tracing::instrument(name = "List campaigns", skip(store))]
#[get("/campaigns")]
async fn list_campaigns(
    _admin: Administrator, // Administrator guard
    store: web::Data<dyn Store>,
) -> ApiResult<HttpResponse> {
    let campaigns = store.list_campaigns().await?;

    Ok(json_response(
        StatusCode::OK,
        &CampaignsResponse {
            ok: true,
            campaigns,
        },
    ))
}

#[tracing::instrument(name = "Upsert campaign", skip(body, client, store))]
#[post("/campaigns")]
async fn upsert_campaign(
    admin: Administrator, // Administrator guard
    client: ClientContext,
    body: web::Bytes,
    store: web::Data<dyn Store>,
) -> ApiResult<HttpResponse> {
    admin.require_write()?;

    let form: CampaignForm = parse_json_object(&body)?;
    let draft = CampaignDraft::try_from(form)?;

    store.upsert_campaign(&draft).await?;

    record_event_best_effort(
        store.get_ref(),
        NewEvent::new(
            EventKind::AdminAction,
            json!({ "action": "upsert_campaign", "role": admin.role.as_str() }),
        )
        .campaign(draft.id.as_ref())
        .ip(client.ip),
    )
    .await;

    Ok(json_response(StatusCode::OK, &json!({ "ok": true })))
}

#[tracing::instrument(name = "Fetch stats", skip(store))]
#[get("/stats")]
async fn stats(
    _admin: Administrator, // Administrator guard
    store: web::Data<dyn Store>,
) -> ApiResult<HttpResponse> {
    let stats = store.stats().await?;

    Ok(json_response(StatusCode::OK, &StatsResponse { ok: true, stats }))
}

/// Admin API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/admin")
        .service(list_campaigns)
        .service(upsert_campaign)
        .service(stats)
}
