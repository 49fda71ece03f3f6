//! Tool declarations, tool choice and response format resolution

use crate::error::LlmError;
use crate::protocol::runner::{WireFunction, WireResponseFormat, WireTool};
use crate::types::{ResponseFormat, ToolChoice, ToolDefinition};

/// Tool fields of a runner request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedTools {
    /// Wire tools; `None` rather than an empty list
    pub tools: Option<Vec<WireTool>>,
    /// Wire tool choice
    pub tool_choice: Option<String>,
}

/// Map caller tool declarations and choice policy to their wire form
///
/// An empty tool list yields no tools and no choice: some models reject an
/// empty `tools` array.
pub fn prepare_tools(tools: &[ToolDefinition], choice: Option<&ToolChoice>) -> Result<PreparedTools, LlmError> {
    if tools.is_empty() {
        return Ok(PreparedTools::default());
    }

    let wire_tools: Vec<WireTool> = tools
        .iter()
        .map(|tool| WireTool {
            tool_type: "function".to_owned(),
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        })
        .collect();

    let Some(choice) = choice else {
        return Ok(PreparedTools {
            tools: Some(wire_tools),
            tool_choice: None,
        });
    };

    let (tools, tool_choice) = match choice {
        ToolChoice::Auto => (wire_tools, "auto"),
        ToolChoice::None => (wire_tools, "none"),
        ToolChoice::Required => (wire_tools, "any"),
        ToolChoice::Tool { tool_name } => {
            let forced: Vec<WireTool> = wire_tools
                .into_iter()
                .filter(|tool| &tool.function.name == tool_name)
                .collect();
            if forced.is_empty() {
                return Err(LlmError::UnsupportedToolChoice(format!("undeclared tool `{tool_name}`")));
            }
            (forced, "any")
        }
        ToolChoice::Other(value) => {
            let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or("unknown");
            return Err(LlmError::UnsupportedToolChoice(kind.to_owned()));
        }
    };

    Ok(PreparedTools {
        tools: Some(tools),
        tool_choice: Some(tool_choice.to_owned()),
    })
}

/// Map a requested response format to its wire form
pub fn prepare_response_format(format: Option<&ResponseFormat>) -> Result<Option<WireResponseFormat>, LlmError> {
    match format {
        None | Some(ResponseFormat::Text) => Ok(None),
        Some(ResponseFormat::Json { schema: Some(schema) }) => Ok(Some(WireResponseFormat::JsonSchema {
            json_schema: schema.clone(),
        })),
        Some(ResponseFormat::Json { schema: None }) => Ok(Some(WireResponseFormat::JsonObject)),
        Some(ResponseFormat::Other(value)) => {
            let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or("unknown");
            Err(LlmError::UnsupportedResponseFormat(kind.to_owned()))
        }
    }
}
