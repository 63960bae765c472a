use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::reports::distress::{
    ConfidenceThreshold, PolicyError, ScoringPolicy, UrgentCutoff,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub model: ModelConfig,
    pub scoring: ScoringPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_url = optional_var("DATABASE_URL");
        let max_connections = match optional_var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidPoolSize(raw))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let scoring = ScoringPolicy {
            confidence_threshold: match optional_var("DISTRESS_CONFIDENCE_THRESHOLD") {
                Some(raw) => ConfidenceThreshold::new(parse_number(
                    "DISTRESS_CONFIDENCE_THRESHOLD",
                    &raw,
                )?)?,
                None => ConfidenceThreshold::default(),
            },
            urgent_cutoff: match optional_var("URGENT_DISTRESS_CUTOFF") {
                Some(raw) => UrgentCutoff::new(parse_number("URGENT_DISTRESS_CUTOFF", &raw)?)?,
                None => UrgentCutoff::default(),
            },
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store: StoreConfig {
                database_url,
                max_connections,
            },
            model: ModelConfig {
                endpoint: optional_var("SENTIMENT_MODEL_URL"),
                token: optional_var("SENTIMENT_MODEL_TOKEN"),
            },
            scoring,
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number(variable: &'static str, raw: &str) -> Result<f64, ConfigError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ConfigError::InvalidNumber {
            variable,
            value: raw.to_string(),
        })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Report persistence. Without a database URL the process keeps reports in memory.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
}

/// Remote sentiment inference. Without an endpoint the lexicon model is used.
#[derive(Clone)]
pub struct ModelConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPoolSize(String),
    InvalidNumber { variable: &'static str, value: String },
    Policy(PolicyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPoolSize(value) => write!(
                f,
                "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{value}'"
            ),
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a number, got '{value}'")
            }
            ConfigError::Policy(err) => write!(f, "invalid scoring policy: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Policy(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidPoolSize(_)
            | ConfigError::InvalidNumber { .. } => None,
        }
    }
}

impl From<PolicyError> for ConfigError {
    fn from(value: PolicyError) -> Self {
        Self::Policy(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "DATABASE_URL",
            "DATABASE_MAX_CONNECTIONS",
            "SENTIMENT_MODEL_URL",
            "SENTIMENT_MODEL_TOKEN",
            "DISTRESS_CONFIDENCE_THRESHOLD",
            "URGENT_DISTRESS_CUTOFF",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.store.database_url, None);
        assert_eq!(config.store.max_connections, 5);
        assert_eq!(config.model.endpoint, None);
        assert_eq!(config.scoring, ScoringPolicy::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_scoring_policy_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DISTRESS_CONFIDENCE_THRESHOLD", "0.75");
        env::set_var("URGENT_DISTRESS_CUTOFF", "40");
        env::set_var("SENTIMENT_MODEL_URL", "http://127.0.0.1:8080/classify");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.scoring.confidence_threshold.value(), 0.75);
        assert_eq!(config.scoring.urgent_cutoff.value(), 40.0);
        assert_eq!(
            config.model.endpoint.as_deref(),
            Some("http://127.0.0.1:8080/classify")
        );
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DISTRESS_CONFIDENCE_THRESHOLD", "1.5");
        let err = AppConfig::load().expect_err("threshold above one");
        assert!(matches!(err, ConfigError::Policy(_)));

        env::set_var("DISTRESS_CONFIDENCE_THRESHOLD", "high");
        let err = AppConfig::load().expect_err("threshold is not a number");
        assert!(err.to_string().contains("DISTRESS_CONFIDENCE_THRESHOLD"));
        reset_env();
    }

    #[test]
    fn rejects_zero_pool_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DATABASE_MAX_CONNECTIONS", "0");
        let err = AppConfig::load().expect_err("pool must be positive");
        assert!(matches!(err, ConfigError::InvalidPoolSize(_)));
        reset_env();
    }

    #[test]
    fn model_token_is_redacted_in_debug() {
        let config = ModelConfig {
            endpoint: None,
            token: Some("hf_secret".to_string()),
        };
        assert!(!format!("{config:?}").contains("hf_secret"));
    }
}
