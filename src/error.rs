use std::borrow::Cow;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use serde::Serialize;

use thiserror::Error;

use crate::client::ChallengeError;
use crate::crypto::CouponCodeError;
use crate::domain::ValidationError;
use crate::repo::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to API clients as `{ok:false, error:<code>}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request body is not a JSON object")]
    InvalidJson,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Bot-challenge token is required")]
    MissingTurnstileToken,

    #[error("Bot-challenge verification failed")]
    TurnstileFailed,

    #[error("Welcome campaign is missing")]
    MissingWelcomeCampaign,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    InvalidField(#[from] ValidationError),

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    /// Machine-readable error code
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            Self::InvalidJson => "invalid_json".into(),
            Self::InvalidEmail => "invalid_email".into(),
            Self::MissingTurnstileToken => "missing_turnstile_token".into(),
            Self::TurnstileFailed => "turnstile_failed".into(),
            Self::MissingWelcomeCampaign => "missing_welcome_campaign".into(),
            Self::Unauthorized => "unauthorized".into(),
            Self::Forbidden => "forbidden".into(),
            Self::InvalidField(ValidationError(field)) => format!("invalid_{}", field).into(),
            Self::NotFound => "not_found".into(),
            Self::Unexpected(_) => "server_error".into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Unexpected(anyhow::Error::new(e).context("Store operation failed"))
    }
}

impl From<CouponCodeError> for ApiError {
    fn from(e: CouponCodeError) -> Self {
        Self::Unexpected(anyhow::Error::new(e).context("Failed to derive coupon code"))
    }
}

impl From<ChallengeError> for ApiError {
    fn from(e: ChallengeError) -> Self {
        match e {
            ChallengeError::MissingToken => Self::MissingTurnstileToken,
            ChallengeError::Rejected(_) => Self::TurnstileFailed,
            ChallengeError::Transport(e) => Self::Unexpected(
                anyhow::Error::new(e).context("Bot-challenge verification request failed"),
            ),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    ok: bool,
    error: &'a str,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson
            | Self::InvalidEmail
            | Self::MissingTurnstileToken
            | Self::TurnstileFailed
            | Self::InvalidField(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MissingWelcomeCampaign | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error.cause_chain = ?self, "Request failed: {}", self);
        }

        let code = self.code();
        crate::controller::json_response(
            status,
            &ErrorBody {
                ok: false,
                error: &code,
            },
        )
    }
}
