use serde::{Deserialize, Serialize};

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the `max_tokens` limit
    Length,
    /// Content was filtered by safety systems
    ContentFilter,
    /// Model decided to call a tool
    ToolCalls,
    /// Runner reported an error
    Error,
    /// Runner gave a reason with no canonical equivalent
    Other,
    /// Runner gave no reason
    Unknown,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub input_tokens: u32,
    /// Tokens generated in the completion
    pub output_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// A piece of generated content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Generated text
    Text {
        /// The text
        text: String,
    },
    /// Reasoning trace
    Reasoning {
        /// The reasoning text
        text: String,
    },
    /// Tool invocation requested by the model
    ToolCall {
        /// Tool call identifier
        tool_call_id: String,
        /// Name of the tool
        tool_name: String,
        /// JSON-encoded arguments
        args: String,
    },
}

/// Non-fatal notice attached to a successful result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Warning {
    /// A call setting was ignored because the runner does not support it
    UnsupportedSetting {
        /// Setting name
        setting: String,
        /// Extra detail, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl Warning {
    pub(crate) fn unsupported_setting(setting: &str) -> Self {
        Self::UnsupportedSetting {
            setting: setting.to_owned(),
            details: None,
        }
    }
}

/// Result of a single-shot completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResult {
    /// Generated content in order
    pub content: Vec<ContentPart>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Token usage statistics
    pub usage: Usage,
    /// Ignored settings and similar notices
    pub warnings: Vec<Warning>,
}
