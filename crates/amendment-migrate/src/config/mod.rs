//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Apply `DATABASE_URL` and `ENVIRONMENT` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("ENVIRONMENT").ok(),
        )
    }

    fn with_overrides(mut self, database_url: Option<String>, environment: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.target.database_url = url;
        }
        if let Some(env) = environment {
            self.target.environment = env;
        }
        self
    }
}

impl MigrationConfig {
    /// Validate the import settings without a source or target.
    pub fn validate(&self) -> Result<()> {
        validation::validate_migration(self)
    }
}
