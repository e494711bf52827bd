//! Template generator configuration.

use std::path::PathBuf;

use super::parse::{env_or, env_path};
use super::ConfigError;

/// Default name of the template's main plugin file.
pub const DEFAULT_ENTRY_FILE: &str = "pluginboilerplate.php";

/// Where templates come from and where archives are written.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Root of the plugin template tree.
    pub template_dir: PathBuf,
    /// File name (relative to any directory) that gets the synthesized header
    /// and is renamed after the plugin slug.
    pub entry_file: String,
    /// Scratch directory for temporary archives.
    pub temp_dir: PathBuf,
}

impl GeneratorConfig {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_entry_file(mut self, name: impl Into<String>) -> Self {
        self.entry_file = name.into();
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let entry_file = env_or("ENTRY_FILE", DEFAULT_ENTRY_FILE);
        if entry_file.contains('/') || entry_file.contains('\\') {
            return Err(ConfigError::Invalid {
                key: "ENTRY_FILE".into(),
                message: "must be a bare file name".into(),
            });
        }

        Ok(Self {
            template_dir: env_path("TEMPLATE_DIR", "template"),
            entry_file,
            temp_dir: env_path("TEMP_DIR", std::env::temp_dir()),
        })
    }
}
