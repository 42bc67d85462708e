use actix_web::http::header::{self, HeaderMap};

use anyhow::Context;

use secrecy::Secret;

const BEARER_AUTH_PREFIX: &str = "Bearer ";

/// Token presented in an `Authorization: Bearer <token>` header
#[derive(Debug)]
pub struct BearerToken(pub Secret<String>);

impl BearerToken {
    /// Extract the bearer token from the headers of a request
    pub fn from_headers(headers: &HeaderMap) -> anyhow::Result<Self> {
        let header_value = headers
            .get(header::AUTHORIZATION)
            .context("Missing authorization in header")?
            .to_str()?;

        let token = header_value
            .strip_prefix(BEARER_AUTH_PREFIX)
            .context("Authorization scheme not bearer")?
            .trim();
        if token.is_empty() {
            anyhow::bail!("Empty bearer token");
        }

        Ok(Self(Secret::new(token.into())))
    }
}
