use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::model::fields::FieldMappings;

const DEFAULT_WEBHOOK_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_BACKOFF_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} has not been set")]
    MissingVar(&'static str),
    #[error("{var} is not a valid number: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} is not a valid URL with a port: {value:?}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("one of {0}'s ids has not been properly replaced")]
    PlaceholderId(&'static str),
    #[error("{0} should have at least 1 id associated with it")]
    EmptyMapping(&'static str),
    #[error("{field} option {item} has weight {value}, weights must be greater than zero")]
    InvalidWeight {
        field: &'static str,
        item: String,
        value: f64,
    },
    #[error("failed to load field mapping from {}: {source}", path.display())]
    MappingFile {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Credentials and addressing for the Favro REST API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, always ending in `/`.
    pub server_url: String,
    pub email: String,
    pub token: String,
    pub organization_id: String,
}

/// How the score write is attempted. The default fires once with no timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Option<Duration>,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout: None,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    /// Externally reachable base URL, used verbatim when checking signatures.
    pub webhook_url: String,
    pub webhook_secret: String,
    pub fields: FieldMappings,
    pub publish: RetryPolicy,
}

impl AppConfig {
    /// Port to listen on: the webhook URL's explicit port, else the scheme default.
    pub fn port(&self) -> Result<u16, ConfigError> {
        webhook_port(&self.webhook_url)
    }
}

impl ApiConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut server_url = required(lookup, "FAVRO_URL")?;
        if !server_url.ends_with('/') {
            server_url.push('/');
        }
        Ok(Self {
            server_url,
            email: required(lookup, "FAVRO_CALCULATOR_USER")?,
            token: required(lookup, "FAVRO_CALCULATOR_TOKEN")?,
            organization_id: required(lookup, "FAVRO_ORG_ID")?,
        })
    }
}

impl AppConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = ApiConfig::from_lookup(lookup)?;

        let webhook_url =
            optional(lookup, "FAVRO_WEBHOOK_URL").unwrap_or_else(|| DEFAULT_WEBHOOK_URL.into());
        webhook_port(&webhook_url)?;
        let webhook_secret = required(lookup, "FAVRO_WEBHOOK_SECRET_KEY")?;

        let fields = match optional(lookup, "FAVRO_FIELDS_PATH") {
            Some(path) => FieldMappings::from_toml_file(&PathBuf::from(path))?,
            None => FieldMappings::builtin(),
        };
        fields.validate()?;

        let mut publish = RetryPolicy::default();
        if let Some(attempts) = number::<u32>(lookup, "FAVRO_PUBLISH_ATTEMPTS")? {
            publish.max_attempts = attempts.max(1);
        }
        if let Some(secs) = number::<u64>(lookup, "FAVRO_PUBLISH_TIMEOUT_SECS")? {
            publish.attempt_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = number::<u64>(lookup, "FAVRO_PUBLISH_BACKOFF_MS")? {
            publish.backoff = Duration::from_millis(ms);
        }

        Ok(Self {
            api,
            webhook_url,
            webhook_secret,
            fields,
            publish,
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(&env_lookup)
}

pub fn load_api_config() -> Result<ApiConfig, ConfigError> {
    ApiConfig::from_lookup(&env_lookup)
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or(ConfigError::MissingVar(key))
}

fn number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    optional(lookup, key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: key,
                value: raw.clone(),
            })
        })
        .transpose()
}

fn webhook_port(webhook_url: &str) -> Result<u16, ConfigError> {
    Url::parse(webhook_url)
        .ok()
        .and_then(|url| url.port_or_known_default())
        .ok_or_else(|| ConfigError::InvalidUrl {
            var: "FAVRO_WEBHOOK_URL",
            value: webhook_url.to_string(),
        })
}
