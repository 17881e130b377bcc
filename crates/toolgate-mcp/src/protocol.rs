//! MCP Protocol Types
//!
//! The subset of Model Context Protocol messages the gateway speaks:
//! JSON-RPC 2.0 envelopes plus `initialize`, `tools/list` and `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use toolgate_core::{DispatchError, ToolDescriptor};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

impl JsonRpcRequest {
    /// Notifications never get a response
    pub fn is_notification(&self) -> bool {
        self.method.starts_with("notifications/")
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self::failure(id, JsonRpcError::new(code, message))
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<DispatchError> for JsonRpcError {
    fn from(err: DispatchError) -> Self {
        let code = match &err {
            DispatchError::NoKeyword { .. } | DispatchError::ArgumentAdaptation { .. } => {
                INVALID_PARAMS
            }
            DispatchError::UnknownKeyword { .. } | DispatchError::ToolNotFound { .. } => {
                METHOD_NOT_FOUND
            }
            DispatchError::ToolExecution { .. } | DispatchError::DuplicateTool { .. } => {
                INTERNAL_ERROR
            }
        };

        let mut data = Map::new();
        data.insert("kind".to_string(), Value::from(err.kind()));
        if let Some((label, values)) = err.alternatives() {
            data.insert(label.to_string(), Value::from(values.to_vec()));
        }

        Self {
            code,
            message: err.to_string(),
            data: Some(Value::Object(data)),
        }
    }
}

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// MCP Tool Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl From<&ToolDescriptor> for Tool {
    fn from(tool: &ToolDescriptor) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: InputSchema::for_tool(tool),
        }
    }
}

/// JSON Schema for tool input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl InputSchema {
    /// Declared parameters plus the `prompt`/`params` pair accepted by the
    /// keyword path of `tools/call`.
    ///
    /// Required parameters are not listed as required: a call may carry a
    /// `prompt` instead.
    pub fn for_tool(tool: &ToolDescriptor) -> Self {
        let mut properties = Map::new();

        for param in &tool.parameters {
            let mut prop = Map::new();
            prop.insert("type".to_string(), Value::from(param.kind.json_type()));
            if !param.description.is_empty() {
                prop.insert("description".to_string(), Value::from(param.description.clone()));
            }
            if let Some(default) = &param.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }

        properties.insert(
            "prompt".to_string(),
            json!({"type": "string", "description": "Prompt with @keyword"}),
        );
        properties.insert(
            "params".to_string(),
            json!({"type": "object", "description": "Additional parameters"}),
        );

        Self {
            schema_type: "object".to_string(),
            properties,
            required: Vec::new(),
        }
    }
}

/// MCP Text Content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// MCP Tool Result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<TextContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent::new(text)],
            is_error: false,
        }
    }
}

/// Server capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// List tools result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Call tool params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}
