//! Programmatic configuration builder for integration tests

use relay_config::{BackendAuth, BackendConfig, Config, GatewayConfig, ModelConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Direct-endpoint config pointed at `base_url` with no credentials
    pub fn new(base_url: &str) -> Self {
        Self {
            config: Config {
                backend: BackendConfig {
                    account_id: "test-account".to_owned(),
                    base_url: Some(base_url.parse().expect("valid URL")),
                    ..BackendConfig::default()
                },
                models: indexmap::IndexMap::new(),
            },
        }
    }

    /// Authenticate with a static API token
    pub fn with_static_key(mut self, key: &str) -> Self {
        self.config.backend.auth = BackendAuth::StaticKey {
            key: SecretString::from(key),
        };
        self
    }

    /// Authenticate through the gateway with a delegated token
    pub fn with_delegated_token(mut self, token: &str) -> Self {
        self.config.backend.auth = BackendAuth::Delegated {
            token: SecretString::from(token),
        };
        self
    }

    /// Route through a gateway
    pub fn with_gateway(mut self, id: &str, skip_cache: bool, cache_ttl: Option<u64>) -> Self {
        self.config.backend.gateway = Some(GatewayConfig {
            id: id.to_owned(),
            skip_cache,
            cache_ttl,
        });
        self
    }

    /// Add a static header to every runner request
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.config.backend.headers.insert(name.to_owned(), value.to_owned());
        self
    }

    /// Add per-model settings
    pub fn with_model(mut self, model_id: &str, settings: ModelConfig) -> Self {
        self.config.models.insert(model_id.to_owned(), settings);
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("valid test config");
        self.config
    }
}
