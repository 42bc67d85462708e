use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use secrecy::{ExposeSecret, Secret};

use serde::{Deserialize, Serialize};

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("No challenge token supplied")]
    MissingToken,
    #[error("Challenge token rejected: {0:?}")]
    Rejected(Vec<String>),
    #[error("Failed to reach the challenge verification service")]
    Transport(#[from] reqwest::Error),
}

/// Server-side verification of Cloudflare Turnstile tokens
#[derive(Debug)]
pub struct TurnstileClient {
    client: Client,
    verify_url: Url,
    secret_key: Option<Secret<String>>,
}

impl TurnstileClient {
    /// A blank or missing secret disables verification entirely
    pub fn new(
        secret_key: Option<Secret<String>>,
        verify_url: Url,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;
        let secret_key = secret_key.filter(|s| !s.expose_secret().trim().is_empty());

        Ok(Self {
            client,
            verify_url,
            secret_key,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Verify a client token, passing along the client IP when known
    #[tracing::instrument(name = "Verify bot-challenge token", skip(self, token))]
    pub async fn verify(
        &self,
        token: Option<&str>,
        remote_ip: Option<&str>,
    ) -> Result<(), ChallengeError> {
        let Some(secret_key) = &self.secret_key else {
            tracing::debug!("No challenge secret configured, skipping verification");
            return Ok(());
        };

        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ChallengeError::MissingToken)?;

        let outcome: SiteVerifyResponse = self
            .client
            .post(self.verify_url.clone())
            .form(&SiteVerifyRequest {
                secret: secret_key.expose_secret(),
                response: token,
                remoteip: remote_ip,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if outcome.success {
            Ok(())
        } else {
            tracing::info!(error_codes = ?outcome.error_codes, "Challenge token rejected");
            Err(ChallengeError::Rejected(outcome.error_codes))
        }
    }
}

#[derive(Serialize)]
struct SiteVerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remoteip: Option<&'a str>,
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}
