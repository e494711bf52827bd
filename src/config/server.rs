//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::parse::{env_opt, env_or, env_parse, parse_duration};
use super::ConfigError;

/// A duration that can be switched off ("off" / "0").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionalDuration(pub Option<Duration>);

impl OptionalDuration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Some(Duration::from_secs(secs)))
    }

    pub const fn disabled() -> Self {
        Self(None)
    }

    /// Parse duration string (e.g., "30s", "2m", "off").
    pub fn parse(s: &str) -> Result<Self, String> {
        parse_duration(s).map(Self)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    #[inline]
    pub fn as_secs(&self) -> u64 {
        self.0.map(|d| d.as_secs()).unwrap_or(0)
    }

    #[inline]
    pub fn as_duration(&self) -> Option<Duration> {
        self.0
    }
}

/// Request timeout (default: 2 minutes).
pub type RequestTimeout = OptionalDuration;

/// TLS configuration.
#[derive(Clone, Debug, Default)]
pub struct TlsConfig {
    /// Path to TLS certificate (PEM format).
    pub cert_path: Option<PathBuf>,
    /// Path to TLS private key (PEM format).
    pub key_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Check if TLS is configured.
    pub fn is_enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }

    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self {
            cert_path: env_opt("TLS_CERT").map(PathBuf::from),
            key_path: env_opt("TLS_KEY").map(PathBuf::from),
        }
    }
}

/// Server configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `LISTEN_ADDR` | `0.0.0.0:8080` | Server bind address |
/// | `WORKERS` | `0` | Accept loops, 0 = one per CPU core |
/// | `TLS_CERT` / `TLS_KEY` | _(empty)_ | Enables HTTPS |
/// | `DRAIN_TIMEOUT_SECS` | `30` | Graceful shutdown timeout |
/// | `REQUEST_TIMEOUT` | `2m` | Per-request timeout, `off` to disable |
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: SocketAddr,
    /// Number of accept loops. 0 = auto-detect from CPU cores.
    pub workers: usize,
    /// Graceful shutdown drain timeout.
    pub drain_timeout: Duration,
    /// Request timeout.
    pub request_timeout: RequestTimeout,
    /// TLS configuration.
    pub tls: TlsConfig,
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            workers: 0,
            drain_timeout: Duration::from_secs(30),
            request_timeout: OptionalDuration::from_secs(120),
            tls: TlsConfig::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_request_timeout(mut self, timeout: RequestTimeout) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolved accept loop count (never zero).
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr: SocketAddr = env_or("LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .map_err(|e| ConfigError::Parse {
                key: "LISTEN_ADDR".into(),
                value: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
                error: format!("{}", e),
            })?;

        let request_timeout_raw = env_or("REQUEST_TIMEOUT", "2m");
        let request_timeout =
            OptionalDuration::parse(&request_timeout_raw).map_err(|e| ConfigError::Parse {
                key: "REQUEST_TIMEOUT".into(),
                value: request_timeout_raw,
                error: e,
            })?;

        Ok(Self {
            listen_addr,
            workers: env_parse("WORKERS", 0usize)?,
            drain_timeout: Duration::from_secs(env_parse("DRAIN_TIMEOUT_SECS", 30u64)?),
            request_timeout,
            tls: TlsConfig::from_env(),
        })
    }
}
