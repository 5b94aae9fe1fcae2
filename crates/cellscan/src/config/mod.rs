use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;

use crate::quiz::BandPolicy;

const DEFAULT_COMPLETED_SESSION_TTL_SECS: u32 = 3600;

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
    pub quiz: QuizConfig,
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

        let questions_path = env::var("CELLSCAN_QUESTIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/questions.json"));
        let risk_bands_path = env::var("CELLSCAN_RISK_BANDS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/risk_assessments.json"));
        let band_policy = match env::var("CELLSCAN_STRICT_BANDS") {
            Ok(raw) => {
                if parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                    name: "CELLSCAN_STRICT_BANDS",
                    value: raw.clone(),
                })? {
                    BandPolicy::Strict
                } else {
                    BandPolicy::Lenient
                }
            }
            Err(_) => BandPolicy::Strict,
        };
        let ttl_secs = match env::var("CELLSCAN_COMPLETED_SESSION_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidSessionTtl { value: raw.clone() })?,
            Err(_) => DEFAULT_COMPLETED_SESSION_TTL_SECS,
        };
        // Zero keeps completed sessions until they are abandoned.
        let completed_session_ttl =
            (ttl_secs > 0).then(|| Duration::seconds(i64::from(ttl_secs)));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            quiz: QuizConfig {
                questions_path,
                risk_bands_path,
                band_policy,
                completed_session_ttl,
            },
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
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

/// Where the question set and risk bands are read from, and how strictly bands are checked.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    pub questions_path: PathBuf,
    pub risk_bands_path: PathBuf,
    pub band_policy: BandPolicy,
    /// How long a completed session stays readable. `None` keeps it until abandoned.
    pub completed_session_ttl: Option<Duration>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str, value: String },
    InvalidSessionTtl { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false (got '{value}')")
            }
            ConfigError::InvalidSessionTtl { value } => write!(
                f,
                "CELLSCAN_COMPLETED_SESSION_TTL_SECS must be whole seconds (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidSessionTtl { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
