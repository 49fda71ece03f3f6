//! Runner wire format types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::DefaultOnError;

use crate::error::LlmError;

// -- Request types --

/// Request body sent to the runner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerRequest {
    /// Model identifier; carried in the URL, not the body
    #[serde(skip)]
    pub model: String,
    /// Conversation messages
    pub messages: Vec<WireMessage>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    /// Tool choice policy ("auto", "none" or "any")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Random seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Structured output constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<WireResponseFormat>,
    /// Prepend the model's safety prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_prompt: Option<bool>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Single input image as raw bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
}

/// One conversation turn on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message role
    pub role: String,
    /// Flattened text content
    pub content: String,
    /// Tool name, set on tool results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Tool call ID this message responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    /// Message with text content only
    pub fn text(role: &str, content: String) -> Self {
        Self {
            role: role.to_owned(),
            content,
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Tool call within an assistant wire message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireToolCall {
    /// Tool call identifier
    pub id: String,
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function call details
    pub function: WireFunctionCall,
}

/// Function name and JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// Tool definition on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTool {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function specification
    pub function: WireFunction,
}

/// Function specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    pub parameters: Value,
}

/// Structured output constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireResponseFormat {
    /// Any JSON object
    JsonObject,
    /// JSON conforming to a schema
    JsonSchema {
        /// The schema
        json_schema: Value,
    },
}

// -- Response types --

/// Single-shot runner response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerResponse {
    /// Generated text, or a JSON object when a response format was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<RunnerToolCall>>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<RunnerUsage>,
    /// Why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// OpenAI-style choices returned by some models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<RunnerChoice>>,
}

/// Tool call in a single-shot response
///
/// Models disagree on the shape: some nest name and arguments under
/// `function`, others put them at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunnerToolCall {
    /// `{id, type, function: {name, arguments}}`
    Nested {
        /// Tool call identifier
        #[serde(default)]
        id: Option<String>,
        /// Function details
        function: RunnerFunctionCall,
    },
    /// `{name, arguments}`
    Flat {
        /// Tool call identifier
        #[serde(default)]
        id: Option<String>,
        /// Function name
        name: String,
        /// Arguments as a JSON string or object
        #[serde(default)]
        arguments: Option<Value>,
    },
}

/// Function call details in a nested tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerFunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON string or object
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Choice in an OpenAI-style response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerChoice {
    /// Generated message
    #[serde(default)]
    pub message: Option<RunnerChoiceMessage>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message within an OpenAI-style choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerChoiceMessage {
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// Reasoning trace
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<RunnerToolCall>>,
}

/// Token usage as reported by the runner
///
/// Every field may be missing; a count of the wrong type reads as missing.
#[serde_with::serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerUsage {
    /// Prompt tokens
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    /// Completion tokens
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    /// Total tokens
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

/// Single-shot body, with or without the REST API's `result` envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RunnerBody {
    /// `{"result": {...}, "success": true, "errors": [], ...}`
    Envelope {
        /// The model output; `null` when the run failed
        result: Value,
        /// Whether the API considers the run successful
        #[serde(default)]
        success: Option<bool>,
        /// API errors, usually `{code, message}` objects
        #[serde(default)]
        errors: Vec<Value>,
    },
    /// The model output itself
    Bare(RunnerResponse),
}

impl RunnerBody {
    /// Model output regardless of wrapping
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Upstream` if the envelope reports a failure or the
    /// wrapped result is not a model output.
    pub fn into_response(self) -> Result<RunnerResponse, LlmError> {
        match self {
            Self::Bare(response) => Ok(response),
            Self::Envelope { success, errors, .. } if success == Some(false) || !errors.is_empty() => {
                Err(LlmError::Upstream(format!("runner reported failure: {}", error_messages(&errors))))
            }
            Self::Envelope { result: Value::Null, .. } => Ok(RunnerResponse::default()),
            Self::Envelope { result, .. } => serde_json::from_value(result)
                .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}"))),
        }
    }
}

fn error_messages(errors: &[Value]) -> String {
    if errors.is_empty() {
        return "no error details".to_owned();
    }

    errors
        .iter()
        .map(|error| match error.get("message").and_then(Value::as_str) {
            Some(message) => message.to_owned(),
            None => error.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// -- Streaming types --

/// Payload of one SSE frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerStreamChunk {
    /// Incremental text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Partial tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<PartialToolCall>>,
    /// Token usage so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<RunnerUsage>,
    /// OpenAI-style delta choices returned by some models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<RunnerStreamChoice>>,
}

/// Choice within an OpenAI-style stream chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerStreamChoice {
    /// Incremental delta
    #[serde(default)]
    pub delta: RunnerStreamDelta,
}

/// Delta content within a stream choice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerStreamDelta {
    /// Incremental text
    #[serde(default)]
    pub content: Option<String>,
    /// Incremental reasoning
    #[serde(default)]
    pub reasoning_content: Option<String>,
    /// Partial tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<PartialToolCall>>,
}

/// Fragment of a tool call, keyed by `index` for reassembly
///
/// Name and arguments arrive either nested under `function` or flat on the
/// fragment itself, mirroring the two single-shot shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialToolCall {
    /// Position of the call this fragment belongs to
    #[serde(default)]
    pub index: u32,
    /// Tool call ID (usually first fragment only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Partial function call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<PartialFunctionCall>,
    /// Function name fragment, flat shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments fragment, flat shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Partial function call within a fragment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFunctionCall {
    /// Function name fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments fragment: a piece of a JSON string, or a whole object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}
