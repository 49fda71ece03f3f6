#![allow(clippy::must_use_candidate)]

pub mod backend;
mod env;
mod loader;
pub mod model;

use indexmap::IndexMap;
use serde::Deserialize;

pub use backend::*;
pub use model::*;

/// Top-level Relay configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Runner endpoint and credentials
    #[serde(default)]
    pub backend: BackendConfig,
    /// Per-model settings keyed by model id
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
}
