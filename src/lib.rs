//! plugin_forge - WordPress plugin generator served over HTTP.
//!
//! A visitor fills in a form describing a plugin (name, slug, namespaces,
//! author, PHP requirement). The server validates the submission, copies a
//! boilerplate template tree while substituting every placeholder, and
//! answers with a ZIP archive of the finished plugin.
//!
//! # Layout
//!
//! - [`forge`] - validation, placeholder substitution and archive assembly
//! - [`security`] - per-session CSRF tokens and the per-IP rate limiter
//! - [`server`] - hyper front end with the form and `/generate` routes
//! - [`config`] - environment-driven configuration
//! - [`logging`] - tracing subscriber setup with JSON and access-log output
//!
//! # Example
//!
//! ```rust,ignore
//! use plugin_forge::{Config, Server};
//!
//! let server = Server::bind(Config::from_env()?)?;
//! server.run().await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars) with optional "-dirty" suffix
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)" or "0.1.0 (abc12345-dirty)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod config;
pub mod core;
pub mod forge;
pub mod logging;
pub mod security;
pub mod server;

pub use config::Config;
pub use server::Server;
