use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VortexError};
use crate::utils::get_env_with_prefix;

/// Immutable integration settings.
///
/// Built once with [`VortexConfigBuilder`] and shared read-only (usually behind
/// an `Arc`). Secrets are held as [`SecretString`] so `Debug` output never
/// contains them.
#[derive(Debug)]
pub struct VortexConfig {
    api_key: Option<SecretString>,
    webhook_secret: Option<SecretString>,
    base_path: String,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_base_path() -> String {
    "/vortex".to_string()
}

impl VortexConfig {
    pub fn builder() -> VortexConfigBuilder {
        VortexConfigBuilder::new()
    }

    /// API key used to construct the invitation service client.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret())
    }

    /// Shared secret that webhook deliveries are signed with.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_ref().map(|secret| secret.expose_secret())
    }

    /// Path prefix the invitation routes are nested under.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// Builder for [`VortexConfig`] with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct VortexConfigBuilder {
    api_key: Option<SecretString>,
    webhook_secret: Option<SecretString>,
    base_path: String,
    logging: LoggingConfig,
}

impl VortexConfigBuilder {
    pub fn new() -> Self {
        Self {
            api_key: None,
            webhook_secret: None,
            base_path: default_base_path(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.logging.json = enabled;
        self
    }

    /// Load settings from environment variables with VORTEX_ prefix
    ///
    /// Reads `API_KEY`, `WEBHOOK_SECRET`, `BASE_PATH`, `LOG_LEVEL` and
    /// `LOG_JSON`. Values already set on the builder are overwritten only when
    /// the variable exists.
    pub fn from_env(mut self) -> Self {
        if let Some(api_key) = get_env_with_prefix("API_KEY") {
            self.api_key = Some(SecretString::from(api_key));
        }
        if let Some(secret) = get_env_with_prefix("WEBHOOK_SECRET") {
            self.webhook_secret = Some(SecretString::from(secret));
        }
        if let Some(base_path) = get_env_with_prefix("BASE_PATH") {
            self.base_path = base_path;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.logging.json = json.parse().unwrap_or(false);
        }
        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// - an API key or webhook secret that is set but empty
    /// - a base path that does not start with `/` or ends with `/`
    /// - an unknown log level
    pub fn build(self) -> Result<VortexConfig> {
        if self.api_key.as_ref().is_some_and(|k| k.expose_secret().trim().is_empty()) {
            return Err(VortexError::bad_request("API key must not be empty"));
        }

        if self
            .webhook_secret
            .as_ref()
            .is_some_and(|s| s.expose_secret().is_empty())
        {
            return Err(VortexError::bad_request("Webhook secret must not be empty"));
        }

        if !self.base_path.starts_with('/') {
            return Err(VortexError::bad_request(format!(
                "Invalid base path '{}': must start with '/'",
                self.base_path
            )));
        }
        if self.base_path.len() > 1 && self.base_path.ends_with('/') {
            return Err(VortexError::bad_request(format!(
                "Invalid base path '{}': must not end with '/'",
                self.base_path
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(VortexError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        Ok(VortexConfig {
            api_key: self.api_key,
            webhook_secret: self.webhook_secret,
            base_path: self.base_path,
            logging: self.logging,
        })
    }
}

impl Default for VortexConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
