//! Configuration module for plugin_forge.
//!
//! This module provides centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use plugin_forge::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! println!("Template: {}", config.generator.template_dir.display());
//! ```

mod error;
mod generator;
mod logging;
mod parse;
mod security;
mod server;

pub use error::ConfigError;
pub use generator::{GeneratorConfig, DEFAULT_ENTRY_FILE};
pub use logging::{LogFormat, LoggingConfig};
pub use parse::parse_duration;
pub use security::{RateLimitConfig, SecurityConfig, DEFAULT_MAX_SESSIONS};
pub use server::{OptionalDuration, RequestTimeout, ServerConfig, TlsConfig};

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Template and archive configuration.
    pub generator: GeneratorConfig,
    /// Rate limiting and CSRF configuration.
    pub security: SecurityConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            generator: GeneratorConfig::from_env()?,
            security: SecurityConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);
        info!("  Accept loops: {}", self.server.worker_count());
        info!("  Template dir: {}", self.generator.template_dir.display());
        info!("  Entry file: {}", self.generator.entry_file);
        info!("  Temp dir: {}", self.generator.temp_dir.display());

        if self.server.tls.is_enabled() {
            info!("  TLS: enabled");
        }

        if self.server.request_timeout.is_enabled() {
            info!(
                "  Request timeout: {}s",
                self.server.request_timeout.as_secs()
            );
        } else {
            info!("  Request timeout: disabled");
        }

        match self.security.rate_limit {
            Some(ref rl) => info!(
                "  Rate limit: {} req/{}s per IP (records in {})",
                rl.max_requests,
                rl.window_secs,
                rl.storage_dir.display()
            ),
            None => info!("  Rate limit: disabled"),
        }

        info!("  CSRF token TTL: {}s", self.security.csrf_ttl.as_secs());
        info!("  Session cap: {}", self.security.max_sessions);

        if self.logging.access_log {
            info!("  Access log: enabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        // Clear all env vars that might affect the test
        std::env::remove_var("LISTEN_ADDR");
        std::env::remove_var("WORKERS");
        std::env::remove_var("TEMPLATE_DIR");
        std::env::remove_var("ENTRY_FILE");
        std::env::remove_var("RATE_LIMIT");
        std::env::remove_var("RATE_WINDOW");
        std::env::remove_var("CSRF_TTL");
        std::env::remove_var("ACCESS_LOG");

        let config = Config::from_env().expect("Should load config");

        assert_eq!(
            config.server.listen_addr,
            "0.0.0.0:8080".parse().unwrap()
        );
        assert_eq!(config.server.workers, 0);
        assert_eq!(config.generator.template_dir.to_str().unwrap(), "template");
        assert_eq!(config.generator.entry_file, DEFAULT_ENTRY_FILE);

        let rl = config.security.rate_limit.expect("rate limiting on by default");
        assert_eq!(rl.max_requests, 10);
        assert_eq!(rl.window_secs, 60);
        assert_eq!(config.security.csrf_ttl.as_secs(), 3600);
        assert!(!config.logging.access_log);
    }
}
