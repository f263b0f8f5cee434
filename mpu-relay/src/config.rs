use relay::config::{Config as RelayConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// Default filter when `RUST_LOG` is unset
    pub level: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Loads the optional config file, applies the process environment and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.relay.apply_env(lookup)?;
        config.relay.validate()?;

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay::config::{ENV_PORT, ENV_UPSTREAM_API_KEY};
    use std::io::Write;
    use telemetry::GpsPolicy;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://public@sentry.example.com/1
                level: debug
            relay:
                listener:
                    host: 127.0.0.1
                    port: 8080
                upstream:
                    url: https://influx.example.com/api/v1/push/influx/write
                    user: "2618255"
                encoder:
                    gps: inline
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::load_with_env(Some(tmp.path()), no_env).expect("load config");

        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );
        let logging = config.common.logging.expect("logging config");
        assert_eq!(logging.level.as_deref(), Some("debug"));
        assert_eq!(config.relay.listener.port, 8080);
        assert_eq!(config.relay.encoder.gps, GpsPolicy::Inline);
        assert_eq!(config.relay.upstream.missing(), vec!["api_key"]);
    }

    #[test]
    fn env_overrides_file() {
        let tmp = write_tmp_file("relay:\n  listener: {host: 0.0.0.0, port: 8080}\n");
        let config = Config::load_with_env(Some(tmp.path()), |key| match key {
            ENV_PORT => Some("9090".into()),
            ENV_UPSTREAM_API_KEY => Some("glc_secret".into()),
            _ => None,
        })
        .expect("load config");

        assert_eq!(config.relay.listener.port, 9090);
        assert_eq!(config.relay.upstream.api_key.as_deref(), Some("glc_secret"));
    }

    #[test]
    fn no_file_uses_defaults() {
        let config = Config::load_with_env(None, no_env).expect("load config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn errors() {
        assert!(matches!(
            Config::load_with_env(Some(Path::new("/nonexistent/mpu-relay.yaml")), no_env),
            Err(ConfigError::LoadError(_))
        ));

        let tmp = write_tmp_file("relay: [not, a, map]");
        assert!(matches!(
            Config::load_with_env(Some(tmp.path()), no_env),
            Err(ConfigError::ParseError(_))
        ));

        let tmp = write_tmp_file("relay:\n  max_body_bytes: 0\n");
        assert!(matches!(
            Config::load_with_env(Some(tmp.path()), no_env),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
