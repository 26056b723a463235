//! Service configuration for the table client.

use crate::utils::{EnvUtils, EnvVarError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_ACCOUNT_URL: &str = "TABLES_ACCOUNT_URL";
pub const ENV_TABLE_NAME: &str = "TABLES_TABLE_NAME";
pub const ENV_CREDENTIAL_KIND: &str = "TABLES_CREDENTIAL_KIND";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TABLES_REQUEST_TIMEOUT_SECS";
pub const ENV_ALLOW_INSECURE_CONNECTION: &str = "TABLES_ALLOW_INSECURE_CONNECTION";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Environment(#[from] EnvVarError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How requests to the account are authenticated.
///
/// Only the shape of the batch URL depends on this: a shared access signature
/// lives in the account URL's query string and must follow the `$batch`
/// segment, while key and token credentials are applied by the sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    #[default]
    SasUrl,
    SharedKey,
    Token,
}

impl CredentialKind {
    pub fn is_sas_url(&self) -> bool {
        matches!(self, CredentialKind::SasUrl)
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sas" | "sas_url" | "sasurl" => Ok(CredentialKind::SasUrl),
            "shared_key" | "sharedkey" | "named_key" => Ok(CredentialKind::SharedKey),
            "token" | "bearer" => Ok(CredentialKind::Token),
            other => Err(format!(
                "unknown credential kind '{other}' (expected sas_url, shared_key or token)"
            )),
        }
    }
}

/// Connection settings for one table.
///
/// # Examples
///
/// ```no_run
/// use tables::config::TableServiceConfig;
///
/// let config = TableServiceConfig::new(
///     "https://myaccount.table.core.windows.net/?sv=2019-02-02&sig=abc",
///     "orders",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableServiceConfig {
    pub account_url: String,
    pub table_name: String,
    #[serde(default)]
    pub credential: CredentialKind,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub allow_insecure_connection: bool,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl TableServiceConfig {
    pub fn new(account_url: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            account_url: account_url.into(),
            table_name: table_name.into(),
            credential: CredentialKind::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            allow_insecure_connection: false,
        }
    }

    pub fn with_credential(mut self, credential: CredentialKind) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_allow_insecure_connection(mut self, allow: bool) -> Self {
        self.allow_insecure_connection = allow;
        self
    }

    pub fn with_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Loads the configuration from `TABLES_*` environment variables.
    ///
    /// `TABLES_ACCOUNT_URL` and `TABLES_TABLE_NAME` are required; the rest fall
    /// back to their defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let account_url = EnvUtils::get_validated_var(ENV_ACCOUNT_URL)?;
        let table_name = EnvUtils::get_validated_var(ENV_TABLE_NAME)?;
        let credential = EnvUtils::get_optional_parsed_var::<CredentialKind>(ENV_CREDENTIAL_KIND)?
            .unwrap_or_default();
        let request_timeout_secs =
            EnvUtils::get_optional_parsed_var::<u64>(ENV_REQUEST_TIMEOUT_SECS)?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let allow_insecure_connection =
            EnvUtils::get_optional_parsed_var::<bool>(ENV_ALLOW_INSECURE_CONNECTION)?
                .unwrap_or(false);

        let config = Self {
            account_url,
            table_name,
            credential,
            request_timeout_secs,
            allow_insecure_connection,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_url.trim().is_empty() {
            return Err(ConfigError::Invalid("account URL cannot be empty".to_string()));
        }
        if self.table_name.trim().is_empty() {
            return Err(ConfigError::Invalid("table name cannot be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
