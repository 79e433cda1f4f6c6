//! Connector configuration, loaded from YAML at startup.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub log_settings: LogSettings,
    pub auth_settings: AuthSettings,
    pub api_server_settings: ApiServerSettings,

    /// Seconds between incremental sync cycles.
    pub update_interval: u64,

    /// Seconds between periodic reconciliation cycles.
    pub reconciliation_interval: u64,

    /// Seconds between usage pushes.
    pub usage_report_interval: u64,

    #[serde(rename = "externalSystemURL")]
    pub external_system_url: String,

    pub watermark_policy: WatermarkPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            auth_settings: AuthSettings::default(),
            api_server_settings: ApiServerSettings::default(),
            update_interval: 5,
            reconciliation_interval: 86_400,
            usage_report_interval: 21_600,
            external_system_url: String::new(),
            watermark_policy: WatermarkPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogSettings {
    /// One of trace/debug/info/warn/error/fatal/panic.
    pub log_level: String,
    pub with_json_formatter: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            with_json_formatter: true,
        }
    }
}

impl LogSettings {
    /// Directive for the tracing filter. `fatal` and `panic` have no tracing
    /// counterpart and collapse to `error`.
    pub fn tracing_directive(&self) -> &'static str {
        match self.log_level.as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            _ => "error",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiServerSettings {
    #[serde(rename = "baseURL")]
    pub base_url: String,
}

/// When an incremental cycle commits the watermark returned with its first
/// page.
///
/// `Eager` assigns it before processing (a later page failure can skip the
/// missed deltas until reconciliation catches them); `Deferred` assigns it
/// only once every page of the cycle has decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkPolicy {
    #[default]
    Eager,
    Deferred,
}

impl Config {
    /// Load from a YAML file, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Config = serde_yaml::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// `AUTH_CLIENT_ID` / `AUTH_CLIENT_SECRET` take precedence over the file.
    pub fn apply_env(&mut self) {
        if let Ok(id) = std::env::var("AUTH_CLIENT_ID") {
            self.auth_settings.client_id = id;
        }
        if let Ok(secret) = std::env::var("AUTH_CLIENT_SECRET") {
            self.auth_settings.client_secret = secret;
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        match self.log_settings.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "fatal" | "panic" => {}
            other => {
                return Err(Error::Config(format!("invalid logging level: {other}")));
            }
        }

        let base = self
            .api_server_settings
            .base_url
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base)
            .map_err(|_| Error::Config(format!("invalid API server base url: {base}")))?;
        self.api_server_settings.base_url = base;

        url::Url::parse(&self.external_system_url).map_err(|_| {
            Error::Config(format!(
                "invalid external system url: {}",
                self.external_system_url
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_yaml() -> &'static str {
        r#"
authSettings:
  clientID: client-1
  clientSecret: secret-1
apiServerSettings:
  baseURL: https://cloud.example.com/
externalSystemURL: http://localhost:8080
logSettings:
  logLevel: info
updateInterval: 10
"#
    }

    #[test]
    fn parses_yaml_and_applies_defaults() {
        let mut config: Config = serde_yaml::from_str(valid_yaml()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.auth_settings.client_id, "client-1");
        assert_eq!(config.update_interval, 10);
        assert_eq!(config.reconciliation_interval, 86_400);
        assert_eq!(config.usage_report_interval, 21_600);
        assert_eq!(config.watermark_policy, WatermarkPolicy::Eager);
        // Trailing slash trimmed by validation.
        assert_eq!(
            config.api_server_settings.base_url,
            "https://cloud.example.com"
        );
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config::default();
        config.api_server_settings.base_url = "https://cloud.example.com".into();
        config.external_system_url = "http://localhost:8080".into();
        config.log_settings.log_level = "verbose".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid logging level"));
    }

    #[test]
    fn rejects_unparseable_urls() {
        let mut config = Config::default();
        config.api_server_settings.base_url = "not a url".into();
        config.external_system_url = "http://localhost:8080".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api_server_settings.base_url = "https://cloud.example.com".into();
        config.external_system_url = "".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn fatal_and_panic_collapse_to_error_directive() {
        let mut settings = LogSettings::default();
        settings.log_level = "fatal".into();
        assert_eq!(settings.tracing_directive(), "error");
        settings.log_level = "panic".into();
        assert_eq!(settings.tracing_directive(), "error");
        settings.log_level = "trace".into();
        assert_eq!(settings.tracing_directive(), "trace");
    }

    #[test]
    fn parses_deferred_watermark_policy() {
        let config: Config =
            serde_yaml::from_str("watermarkPolicy: deferred\n").unwrap();
        assert_eq!(config.watermark_policy, WatermarkPolicy::Deferred);
    }

    #[test]
    fn env_overrides_credentials() {
        std::env::set_var("AUTH_CLIENT_ID", "env-client");
        std::env::set_var("AUTH_CLIENT_SECRET", "env-secret");
        let mut config: Config = serde_yaml::from_str(valid_yaml()).unwrap();
        config.apply_env();
        std::env::remove_var("AUTH_CLIENT_ID");
        std::env::remove_var("AUTH_CLIENT_SECRET");

        assert_eq!(config.auth_settings.client_id, "env-client");
        assert_eq!(config.auth_settings.client_secret, "env-secret");
    }
}
