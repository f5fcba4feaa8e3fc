use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Client configuration: validated tunables and URL building.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    pub fn from_app(app: AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;
        Ok(Self { app })
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app })
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}
