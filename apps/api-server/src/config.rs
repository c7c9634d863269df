//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use std::env;
use std::fmt;

use domain::service::ValidatorOptions;
use kontent_client::{KontentConfig, KontentError};

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<KontentError> for ConfigError {
    fn from(e: KontentError) -> Self {
        match e {
            KontentError::Config(field) => ConfigError {
                field,
                message: "Required".into(),
            },
            other => ConfigError {
                field: "KONTENT",
                message: other.to_string(),
            },
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// Log format
    pub log_format: LogFormat,
    /// Codename of the redirect content type (default: url_redirect)
    pub redirect_type: String,
    /// Workflow step counted as live (default: published)
    pub published_step: String,
    /// Whether target URLs must resolve to published content
    pub validate_target: bool,
    /// CMS connection settings
    pub kontent: KontentConfig,
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(s) => s.parse().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}'", s),
            })?,
            Err(_) => 3001,
        };

        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()));

        let defaults = ValidatorOptions::default();
        let redirect_type = non_empty("REDIRECT_TYPE").unwrap_or(defaults.redirect_type);
        let published_step = non_empty("PUBLISHED_STEP").unwrap_or(defaults.published_step);
        let validate_target = http_common::env_flag("VALIDATE_TARGET_URL");

        let kontent = KontentConfig::from_env()?;

        Ok(Self {
            port,
            log_format,
            redirect_type,
            published_step,
            validate_target,
            kontent,
        })
    }

    pub fn validator_options(&self) -> ValidatorOptions {
        ValidatorOptions {
            redirect_type: self.redirect_type.clone(),
            published_step: self.published_step.clone(),
            validate_target: self.validate_target,
        }
    }

    /// Log the effective settings (keys are redacted by `KontentConfig`).
    pub fn log_summary(&self) {
        tracing::info!(
            redirect_type = %self.redirect_type,
            published_step = %self.published_step,
            validate_target = self.validate_target,
            kontent = ?self.kontent,
            "validator configured"
        );
        if !self.validate_target {
            tracing::info!("VALIDATE_TARGET_URL not set: only source URL uniqueness is checked");
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("anything"), LogFormat::Pretty);
    }

    #[test]
    fn kontent_errors_name_the_variable() {
        let err: ConfigError = KontentError::Config("KONTENT_ENVIRONMENT_ID").into();
        assert_eq!(err.field, "KONTENT_ENVIRONMENT_ID");
        assert!(err.to_string().contains("KONTENT_ENVIRONMENT_ID"));
    }

    #[test]
    fn options_follow_config() {
        let cfg = Config {
            port: 1,
            log_format: LogFormat::Pretty,
            redirect_type: "redirect".into(),
            published_step: "live".into(),
            validate_target: true,
            kontent: KontentConfig::new("env", "key"),
        };
        let opts = cfg.validator_options();
        assert_eq!(opts.redirect_type, "redirect");
        assert_eq!(opts.published_step, "live");
        assert!(opts.validate_target);
    }
}
