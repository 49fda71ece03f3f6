use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool the model can call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the function parameters
    pub parameters: Value,
}

/// How the model should select tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides whether to call tools
    Auto,
    /// Model will not call any tools
    None,
    /// Model must call at least one tool
    Required,
    /// Model must call the named tool
    Tool {
        /// Name of the tool to force
        tool_name: String,
    },
    /// Any other choice kind; rejected when tools are prepared
    #[serde(untagged)]
    Other(Value),
}
