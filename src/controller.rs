mod admin;
mod client_context;
mod subscriptions;

pub use admin::scope as admin_scope;
pub use client_context::ClientContext;
pub use subscriptions::subscribe;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Serialize a JSON reply with an explicit utf-8 content type
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_string(body) {
        Ok(body) => HttpResponse::build(status)
            .content_type(JSON_CONTENT_TYPE)
            .body(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            HttpResponse::InternalServerError()
                .content_type(JSON_CONTENT_TYPE)
                .body(r#"{"ok":false,"error":"server_error"}"#)
        }
    }
}

/// Parse a request body that must be a JSON object into `T`
pub fn parse_json_object<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    if !value.is_object() {
        return Err(ApiError::InvalidJson);
    }
    serde_json::from_value(value).map_err(|_| ApiError::InvalidJson)
}
