use serde::Deserialize;
use telemetry::EncoderOptions;
use thiserror::Error;
use url::Url;

/// Environment variables read once at startup, on top of the config file.
pub const ENV_PORT: &str = "PORT";
pub const ENV_UPSTREAM_URL: &str = "GRAFANA_URL";
pub const ENV_UPSTREAM_USER: &str = "GRAFANA_USER";
pub const ENV_UPSTREAM_API_KEY: &str = "GRAFANA_API_KEY";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Invalid port value: {0}")]
    InvalidPortValue(String),

    #[error("Invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    #[error("Upstream URL must use http or https, got {0}")]
    UnsupportedScheme(String),

    #[error("Upstream timeout cannot be 0")]
    InvalidTimeout,

    #[error("Probe measurement cannot be empty")]
    EmptyProbeMeasurement,

    #[error("Request body limit cannot be 0")]
    InvalidBodyLimit,
}

/// Relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listener for the tablet facing endpoint
    pub listener: Listener,
    /// Optional listener for `/health` and `/ready`
    pub admin_listener: Option<Listener>,
    /// Remote ingestion endpoint
    pub upstream: UpstreamConfig,
    /// Line encoding policy
    pub encoder: EncoderOptions,
    /// Connectivity probe line
    pub probe: ProbeConfig,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            admin_listener: None,
            upstream: UpstreamConfig::default(),
            encoder: EncoderOptions::default(),
            probe: ProbeConfig::default(),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl Config {
    /// Validates the relay configuration
    ///
    /// Missing upstream credentials are not an error here: the relay still
    /// starts and every submission reports the missing pieces.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if let Some(admin_listener) = &self.admin_listener {
            admin_listener.validate()?;
        }

        self.upstream.validate()?;

        if self.probe.measurement.trim().is_empty() {
            return Err(ValidationError::EmptyProbeMeasurement);
        }

        if self.max_body_bytes == 0 {
            return Err(ValidationError::InvalidBodyLimit);
        }

        Ok(())
    }

    /// Applies environment overrides. `lookup` is normally `std::env::var`;
    /// blank values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(port) = lookup(ENV_PORT) {
            self.listener.port = port
                .trim()
                .parse()
                .map_err(|_| ValidationError::InvalidPortValue(port))?;
        }

        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            let url = Url::parse(url.trim())
                .map_err(|e| ValidationError::InvalidUpstreamUrl(e.to_string()))?;
            self.upstream.url = Some(url);
        }

        if let Some(user) = lookup(ENV_UPSTREAM_USER) {
            self.upstream.user = Some(user);
        }

        if let Some(api_key) = lookup(ENV_UPSTREAM_API_KEY) {
            self.upstream.api_key = Some(api_key);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Upstream ingestion endpoint and its Basic auth credentials
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub url: Option<Url>,
    pub user: Option<String>,
    pub api_key: Option<String>,
    /// Covers connect, send and reading the response
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            url: None,
            user: None,
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.url
            && !matches!(url.scheme(), "http" | "https")
        {
            return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }

    /// Names of the settings that still need a value before relaying works.
    pub fn missing(&self) -> Vec<&'static str> {
        let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());

        let mut missing = Vec::new();
        if self.url.is_none() {
            missing.push("url");
        }
        if blank(&self.user) {
            missing.push("user");
        }
        if blank(&self.api_key) {
            missing.push("api_key");
        }
        missing
    }

    pub fn is_configured(&self) -> bool {
        self.missing().is_empty()
    }
}

/// The line written for `{"test": true}` requests
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub measurement: String,
    pub source: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            measurement: "mpu_connection_test".into(),
            source: "mpu_relay".into(),
        }
    }
}
