use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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
    pub source: SourceConfig,
    pub profile: ProfileConfig,
    pub matching: MatchingConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            source: SourceConfig::from_env()?,
            profile: ProfileConfig::from_env()?,
            matching: MatchingConfig::from_env()?,
        })
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

/// Connection settings for the upstream table source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: String,
    pub page_size: usize,
    pub fetch_retries: u32,
    pub reference_cache_ttl: Duration,
}

impl SourceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = require_env("SOURCE_URL")?;
        let api_key = require_env("SOURCE_API_KEY")?;

        let page_size = env::var("SOURCE_PAGE_SIZE")
            .unwrap_or_else(|_| "1000".to_string())
            .parse::<usize>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or(ConfigError::InvalidPageSize)?;

        let fetch_retries = env::var("SOURCE_FETCH_RETRIES")
            .unwrap_or_else(|_| "2".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidRetries)?;

        let ttl_secs = env::var("REFERENCE_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidCacheTtl)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            page_size,
            fetch_retries,
            reference_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

/// Settings for the hosted-model profile generator.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl ProfileConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_url = env::var("PROFILE_API_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
        let api_key = require_env("PROFILE_API_KEY")?;
        let model = env::var("PROFILE_MODEL").unwrap_or_else(|_| "qwen/qwen3-32b".to_string());

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

/// Soft-validation thresholds for the matching entrypoint.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub min_benchmarks: usize,
    pub recommended_benchmarks: usize,
    pub completeness_warning_threshold: f64,
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let threshold = env::var("COMPLETENESS_WARNING_THRESHOLD")
            .unwrap_or_else(|_| "80".to_string())
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidThreshold)?;

        Ok(Self {
            min_benchmarks: 1,
            recommended_benchmarks: 3,
            completeness_warning_threshold: threshold,
        })
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_benchmarks: 1,
            recommended_benchmarks: 3,
            completeness_warning_threshold: 80.0,
        }
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingEnv { name })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPageSize,
    InvalidRetries,
    InvalidCacheTtl,
    InvalidThreshold,
    MissingEnv { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPageSize => {
                write!(f, "SOURCE_PAGE_SIZE must be a positive integer")
            }
            ConfigError::InvalidRetries => {
                write!(f, "SOURCE_FETCH_RETRIES must be a non-negative integer")
            }
            ConfigError::InvalidCacheTtl => {
                write!(f, "REFERENCE_CACHE_TTL_SECS must be a non-negative integer")
            }
            ConfigError::InvalidThreshold => {
                write!(f, "COMPLETENESS_WARNING_THRESHOLD must be a number")
            }
            ConfigError::MissingEnv { name } => write!(f, "{name} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SOURCE_URL",
            "SOURCE_API_KEY",
            "SOURCE_PAGE_SIZE",
            "SOURCE_FETCH_RETRIES",
            "REFERENCE_CACHE_TTL_SECS",
            "PROFILE_API_URL",
            "PROFILE_API_KEY",
            "PROFILE_MODEL",
            "COMPLETENESS_WARNING_THRESHOLD",
        ] {
            env::remove_var(name);
        }
    }

    fn set_required_credentials() {
        env::set_var("SOURCE_URL", "https://tables.example.com/");
        env::set_var("SOURCE_API_KEY", "table-key");
        env::set_var("PROFILE_API_KEY", "profile-key");
    }

    #[test]
    fn load_uses_defaults_when_optional_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();

        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.source.base_url, "https://tables.example.com");
        assert_eq!(config.source.page_size, 1000);
        assert_eq!(config.source.fetch_retries, 2);
        assert_eq!(config.source.reference_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.profile.model, "qwen/qwen3-32b");
        assert_eq!(config.matching.min_benchmarks, 1);
        assert_eq!(config.matching.recommended_benchmarks, 3);
    }

    #[test]
    fn load_rejects_missing_source_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PROFILE_API_KEY", "profile-key");

        let error = AppConfig::load().expect_err("missing SOURCE_URL should fail");
        assert!(matches!(
            error,
            ConfigError::MissingEnv { name: "SOURCE_URL" }
        ));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();
        env::set_var("APP_HOST", "localhost");

        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rejects_zero_page_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_credentials();
        env::set_var("SOURCE_PAGE_SIZE", "0");

        let error = AppConfig::load().expect_err("zero page size should fail");
        assert!(matches!(error, ConfigError::InvalidPageSize));
    }
}
