//! Rate limiting and CSRF/session configuration.

use std::path::PathBuf;
use std::time::Duration;

use super::parse::{env_bool, env_parse, env_path, env_required_duration};
use super::ConfigError;

/// File-backed sliding window rate limit settings.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Max requests per identifier per window.
    pub max_requests: u64,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Directory holding one JSON record per identifier.
    pub storage_dir: PathBuf,
    /// Chance (0-100) that a check also sweeps stale records.
    pub cleanup_percent: u8,
}

impl RateLimitConfig {
    pub fn new(max_requests: u64, window_secs: u64, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            max_requests,
            window_secs,
            storage_dir: storage_dir.into(),
            cleanup_percent: 1,
        }
    }

    pub fn with_cleanup_percent(mut self, percent: u8) -> Self {
        self.cleanup_percent = percent.min(100);
        self
    }
}

/// Default cap on in-memory sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Security configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Rate limiting (None = disabled, RATE_LIMIT=0).
    pub rate_limit: Option<RateLimitConfig>,
    /// CSRF token lifetime.
    pub csrf_ttl: Duration,
    /// Idle session lifetime.
    pub session_ttl: Duration,
    /// Mark the session cookie `Secure`.
    pub secure_cookie: bool,
    /// Most sessions kept in memory; the least recently seen go first.
    pub max_sessions: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            rate_limit: None,
            csrf_ttl: Duration::from_secs(3600),
            session_ttl: Duration::from_secs(86400),
            secure_cookie: false,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl SecurityConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_requests: u64 = env_parse("RATE_LIMIT", 10)?;
        let window_secs: u64 = env_parse("RATE_WINDOW", 60)?;
        if max_requests > 0 && window_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "RATE_WINDOW".into(),
                message: "must be greater than zero when RATE_LIMIT is set".into(),
            });
        }

        let cleanup_percent: u8 = env_parse("RATE_CLEANUP_PERCENT", 1)?;
        if cleanup_percent > 100 {
            return Err(ConfigError::Invalid {
                key: "RATE_CLEANUP_PERCENT".into(),
                message: format!("{} is not a percentage", cleanup_percent),
            });
        }

        let max_sessions: usize = env_parse("MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;
        if max_sessions == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_SESSIONS".into(),
                message: "must be greater than zero".into(),
            });
        }

        let rate_limit = (max_requests > 0).then(|| {
            RateLimitConfig::new(
                max_requests,
                window_secs,
                env_path("RATE_LIMIT_DIR", "storage/rate_limits"),
            )
            .with_cleanup_percent(cleanup_percent)
        });

        Ok(Self {
            rate_limit,
            csrf_ttl: env_required_duration("CSRF_TTL", "1h")?,
            session_ttl: env_required_duration("SESSION_TTL", "1d")?,
            secure_cookie: env_bool("SECURE_COOKIE", false),
            max_sessions,
        })
    }

    /// Check if rate limiting is enabled.
    pub fn is_rate_limiting_enabled(&self) -> bool {
        self.rate_limit.is_some()
    }
}
