use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Runner endpoint configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Account that owns the models
    #[serde(default)]
    pub account_id: String,
    /// Base URL override for the direct or gateway endpoint
    #[serde(default)]
    pub base_url: Option<Url>,
    /// How requests authenticate against the runner
    #[serde(default)]
    pub auth: BackendAuth,
    /// Route requests through an AI gateway instead of the direct endpoint
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
    /// Static headers added to every runner request
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

/// Credentials presented to the runner
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendAuth {
    /// Send no credentials
    #[default]
    None,
    /// API token sent as a bearer `Authorization` header
    StaticKey {
        /// The token
        key: SecretString,
    },
    /// Gateway token; the gateway authenticates upstream on the caller's behalf
    Delegated {
        /// The gateway token
        token: SecretString,
    },
}

/// AI gateway routing options
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Gateway identifier
    pub id: String,
    /// Bypass the gateway response cache
    #[serde(default)]
    pub skip_cache: bool,
    /// Cache TTL in seconds
    #[serde(default)]
    pub cache_ttl: Option<u64>,
}
