use std::future::Future;
use std::pin::Pin;

use actix_web::{dev, web, FromRequest, HttpRequest};

use crate::auth::{AdminRole, AdminTokens, BearerToken, ROLE_HEADER};
use crate::error::{ApiError, ApiResult};

/// An authenticated admin caller
#[derive(Debug, Clone, Copy)]
pub struct Administrator {
    pub role: AdminRole,
}

impl Administrator {
    /// Fail with `forbidden` unless the caller's role may modify data
    pub fn require_write(&self) -> ApiResult<()> {
        if self.role.can_write() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

impl FromRequest for Administrator {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // NOTE: Must be registered with the application at startup
            let tokens = req.app_data::<web::Data<AdminTokens>>().ok_or_else(|| {
                ApiError::Unexpected(anyhow::anyhow!("Admin tokens not registered"))
            })?;

            let role = match req.headers().get(ROLE_HEADER) {
                None => AdminRole::default(),
                Some(value) => value
                    .to_str()
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .ok_or(ApiError::Unauthorized)?,
            };

            let token = BearerToken::from_headers(req.headers()).map_err(|e| {
                tracing::info!(error = %e, "Rejected admin request");
                ApiError::Unauthorized
            })?;

            if !tokens.verify(role, &token.0) {
                tracing::info!(role = %role, "Rejected admin token");
                return Err(ApiError::Unauthorized);
            }

            Ok(Administrator { role })
        })
    }
}
