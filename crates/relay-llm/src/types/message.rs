use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::base64::Base64;

/// Role of a message participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool/function result
    Tool,
    /// Any other role name; rejected during conversion
    #[serde(untagged)]
    Other(String),
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Other(name) => name,
        }
    }
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: Content,
}

impl Message {
    /// System instruction with plain text content
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
        }
    }

    /// User message with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Parts(vec![Part::text(text)]),
        }
    }

    /// Message built from explicit parts
    pub fn with_parts(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role,
            content: Content::Parts(parts),
        }
    }
}

/// Message content, either plain text or structured parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content
    Text(String),
    /// Ordered content parts
    Parts(Vec<Part>),
}

/// Individual part within a multipart message
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Text content block
    Text {
        /// The text string
        text: String,
    },
    /// Inline image
    Image {
        /// Raw image bytes, base64 encoded on the JSON surface
        #[serde_as(as = "Base64")]
        data: Vec<u8>,
        /// Media type (e.g. "image/png")
        mime_type: String,
    },
    /// Tool invocation requested by the assistant
    ToolCall {
        /// Caller-side tool call identifier
        tool_call_id: String,
        /// Name of the tool
        tool_name: String,
        /// JSON-encoded arguments
        args: String,
    },
    /// Output of a tool invocation
    ToolResult {
        /// Identifier of the call this result answers
        tool_call_id: String,
        /// Name of the tool that produced the result
        tool_name: String,
        /// Tool output as JSON
        result: Value,
    },
    /// Model reasoning trace
    Reasoning {
        /// Reasoning text
        text: String,
    },
    /// Any other part type; rejected during conversion
    #[serde(untagged)]
    Other(Value),
}

impl Part {
    /// Text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Short name of the part kind, used in error messages
    pub fn kind(&self) -> &str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Reasoning { .. } => "reasoning",
            Self::Other(value) => value.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        }
    }
}
