//! Runner construction and per-model lookup

use std::sync::Arc;

use indexmap::IndexMap;
use relay_config::{Config, ModelConfig};

use crate::error::LlmError;
use crate::model::{ChatModel, ModelSettings};
use crate::provider::{RestRunner, Runner};

/// Shared runner plus the configured model settings
#[derive(Clone)]
pub struct Backend {
    runner: Arc<dyn Runner>,
    models: IndexMap<String, ModelConfig>,
}

impl Backend {
    /// Build the REST runner described by the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the runner cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let runner = RestRunner::new(&config.backend)?;

        tracing::debug!(
            runner = runner.name(),
            models = config.models.len(),
            "backend initialized"
        );

        Ok(Self::with_runner(Arc::new(runner), config.models.clone()))
    }

    /// Use an already constructed runner
    pub fn with_runner(runner: Arc<dyn Runner>, models: IndexMap<String, ModelConfig>) -> Self {
        Self { runner, models }
    }

    /// Chat model for `model_id`, with its configured settings if any
    pub fn chat_model(&self, model_id: &str) -> ChatModel {
        let settings = self.models.get(model_id).map(ModelSettings::from).unwrap_or_default();

        ChatModel::new(model_id, Arc::clone(&self.runner), settings)
    }

    /// Name of the underlying runner
    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("runner", &self.runner.name())
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
