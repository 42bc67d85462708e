use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use config::{Config, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use url::Url;

use crate::auth::{AdminRole, AdminTokens};
use crate::client::{
    ConsoleEmailSender, DisabledEmailSender, EmailSender, PostmarkClient, ResendClient,
    TurnstileClient,
};
use crate::domain::EmailAddress;

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email: EmailSettings,
    pub turnstile: TurnstileSettings,
    pub coupons: CouponSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        let path = env::current_dir()?.join("settings");
        // Get the current environment based on the `APP_ENV` environment variable, default to `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }
    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        Config::builder()
            .add_source(File::from(base_path.join("base")).required(true))
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // NOTE: Should be used for any prod secrets.
            // Takes the form `APP_<settings category>__<setting name>`.
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    public_url: String,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
    /// The public site linked from outgoing emails
    pub fn public_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.public_url).context("Failed to parse public URL")
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    host: String,
    name: String,
    username: String,
    password: Secret<String>,
    require_ssl: bool,
}

impl DatabaseSettings {
    /// The database connection options, without specifying the database name
    pub fn without_db(&self) -> PgConnectOptions {
        use secrecy::ExposeSecret;

        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .port(self.port)
            .host(&self.host)
            .ssl_mode(ssl_mode)
            .username(&self.username)
            .password(self.password.expose_secret())
    }
    /// The database connection options, with the database name
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.name)
    }
}

/// Which transactional email service delivers coupon emails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Postmark,
    Resend,
    /// Log emails instead of sending them
    Console,
    /// Every send fails, so responses report `emailSent: false`
    None,
}

#[derive(Debug, Deserialize)]
pub struct EmailSettings {
    provider: EmailProvider,
    sender: String,
    api_base_url: String,
    api_auth_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

impl EmailSettings {
    pub fn provider(&self) -> EmailProvider {
        self.provider
    }
    /// The email address to send application emails from
    pub fn sender(&self) -> anyhow::Result<EmailAddress> {
        self.sender
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse email sender address: {}", e))
    }
    /// The email REST API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
    /// The base URL for the email REST service
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url).context("Failed to parse email base URL")
    }
    /// Build the sender for the configured provider
    pub fn sender_client(&self) -> anyhow::Result<Arc<dyn EmailSender>> {
        let client: Arc<dyn EmailSender> = match self.provider {
            EmailProvider::Postmark => Arc::new(PostmarkClient::new(
                self.sender()?,
                self.api_timeout(),
                self.api_base_url()?,
                self.api_auth_token.clone().into(),
            )?),
            EmailProvider::Resend => Arc::new(ResendClient::new(
                self.sender()?,
                self.api_timeout(),
                self.api_base_url()?,
                self.api_auth_token.clone().into(),
            )?),
            EmailProvider::Console => Arc::new(ConsoleEmailSender),
            EmailProvider::None => Arc::new(DisabledEmailSender),
        };
        Ok(client)
    }
}

#[derive(Debug, Deserialize)]
pub struct TurnstileSettings {
    secret_key: Option<Secret<String>>,
    verify_url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    timeout_milliseconds: u64,
}

impl TurnstileSettings {
    pub fn client(&self) -> anyhow::Result<TurnstileClient> {
        let verify_url =
            Url::parse(&self.verify_url).context("Failed to parse challenge verify URL")?;
        TurnstileClient::new(
            self.secret_key.clone(),
            verify_url,
            Duration::from_millis(self.timeout_milliseconds),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CouponSettings {
    pub signing_secret: Option<Secret<String>>,
}

/// Either a map, or a JSON object in a single string (as set from the environment)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RoleTokens {
    Map(HashMap<String, String>),
    Json(String),
}

impl Default for RoleTokens {
    fn default() -> Self {
        Self::Map(HashMap::new())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminSettings {
    #[serde(default)]
    tokens: RoleTokens,
}

impl AdminSettings {
    /// The per-role admin tokens. Unknown role names are rejected.
    pub fn tokens(&self) -> anyhow::Result<AdminTokens> {
        let raw = match &self.tokens {
            RoleTokens::Map(map) => map.clone(),
            RoleTokens::Json(s) if s.trim().is_empty() => HashMap::new(),
            RoleTokens::Json(s) => {
                serde_json::from_str(s).context("Failed to parse admin tokens as JSON")?
            }
        };

        let tokens = raw
            .into_iter()
            .map(|(role, token)| {
                let role: AdminRole = role
                    .parse()
                    .map_err(|_| anyhow::anyhow!("{} is not a valid admin role", role))?;
                Ok((role, Secret::new(token)))
            })
            .collect::<anyhow::Result<HashMap<_, _>>>()?;

        Ok(AdminTokens::new(tokens))
    }
}

/// Either a list, or a comma separated string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OriginList {
    List(Vec<String>),
    Joined(String),
}

impl Default for OriginList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<OriginList> for Vec<String> {
    fn from(origins: OriginList) -> Self {
        match origins {
            OriginList::List(list) => list,
            OriginList::Joined(s) => s
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CorsSettings {
    #[serde(default, deserialize_with = "deserialize_origins")]
    pub allowed_origins: Vec<String>,
}

fn deserialize_origins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    OriginList::deserialize(deserializer).map(Into::into)
}
