use serde::Deserialize;

/// Settings applied to every call made with one model
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Ask the runner to prepend its safety prompt (Mistral-family models)
    #[serde(default)]
    pub safe_prompt: Option<bool>,
    /// Default `max_tokens` when a call does not set one
    #[serde(default)]
    pub max_tokens: Option<u32>,
}
