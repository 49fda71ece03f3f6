use std::path::Path;
use std::str::FromStr;

use http::{HeaderName, HeaderValue};
use secrecy::ExposeSecret;

use crate::{BackendAuth, Config};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// expanded, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        raw.parse()
    }

    /// Validate that the configuration can build a working runner
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_backend()?;
        self.validate_models()?;
        Ok(())
    }

    fn validate_backend(&self) -> anyhow::Result<()> {
        let backend = &self.backend;

        if backend.account_id.trim().is_empty() {
            anyhow::bail!("backend.account_id must not be empty");
        }

        match &backend.auth {
            BackendAuth::None => {}
            BackendAuth::StaticKey { key } if key.expose_secret().is_empty() => {
                anyhow::bail!("backend.auth.key must not be empty");
            }
            BackendAuth::Delegated { token } if token.expose_secret().is_empty() => {
                anyhow::bail!("backend.auth.token must not be empty");
            }
            BackendAuth::StaticKey { .. } | BackendAuth::Delegated { .. } => {}
        }

        if let Some(gateway) = &backend.gateway
            && gateway.id.trim().is_empty()
        {
            anyhow::bail!("backend.gateway.id must not be empty");
        }

        for (name, value) in &backend.headers {
            HeaderName::try_from(name.as_str()).map_err(|e| anyhow::anyhow!("invalid header name '{name}': {e}"))?;
            HeaderValue::try_from(value.as_str())
                .map_err(|e| anyhow::anyhow!("invalid value for header '{name}': {e}"))?;
        }

        Ok(())
    }

    fn validate_models(&self) -> anyhow::Result<()> {
        for (model, settings) in &self.models {
            if model.trim().is_empty() {
                anyhow::bail!("model ids must not be empty");
            }
            if settings.max_tokens == Some(0) {
                anyhow::bail!("models.\"{model}\".max_tokens must be greater than 0");
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }
}
