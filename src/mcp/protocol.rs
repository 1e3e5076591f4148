/// MCP (Model Context Protocol) message structures and JSON-RPC handling
///
/// This module defines the JSON-RPC message format that MCP clients use to
/// communicate with the music toolkit server.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// MCP protocol version we support
pub const MCP_VERSION: &str = "2024-11-05";

/// The only JSON-RPC version spoken
pub const JSONRPC_VERSION: &str = "2.0";

/// Name reported in `serverInfo` and the HTTP descriptor
pub const SERVER_NAME: &str = "MusicToolkit MCP Server";

/// JSON-RPC 2.0 request message
///
/// Every field is optional at this level so a malformed request can still be
/// answered with the right error code and the caller's id.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version; when present it must be "2.0"
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Identifier echoed back in the response
    #[serde(default)]
    pub id: Option<Value>,
    /// The method to call (e.g., "tools/call")
    #[serde(default)]
    pub method: Option<String>,
    /// Parameters for the method call
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message
///
/// Contains either a successful result or an error, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID that we're responding to
    pub id: Value,
    /// Successful result (if no error occurred)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information (if something went wrong)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Error code (standard JSON-RPC codes)
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP tool call parameters
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call (e.g., "wav_to_music_score")
    #[serde(default)]
    pub name: Option<String>,
    /// Arguments to pass to the tool
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

/// MCP tool call result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Tool execution results
    pub content: Vec<ToolContent>,
    /// Whether this is an error result
    pub is_error: bool,
}

/// Content returned by a tool
#[derive(Debug, Serialize)]
pub struct ToolContent {
    /// Type of content (always "text" here)
    #[serde(rename = "type")]
    pub content_type: String,
    /// The actual content/result
    pub text: String,
}

/// MCP tool definition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name (e.g., "wav_to_music_score")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

/// MCP resource definition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Contents of a resource returned by `resources/read`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// MCP prompt definition
#[derive(Debug, Clone, Serialize)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

/// Argument accepted by a prompt
#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Message produced by `prompts/get`
#[derive(Debug, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: ToolContent,
}

/// Parameters for `resources/read`
#[derive(Debug, Deserialize)]
pub struct ResourceReadParams {
    #[serde(default)]
    pub uri: Option<String>,
}

/// Parameters for `prompts/get`
#[derive(Debug, Deserialize)]
pub struct PromptGetParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// MCP server capabilities
#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: ListChangedCapability,
    pub resources: ResourcesCapability,
    pub prompts: ListChangedCapability,
}

/// Capability that can only announce list changes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChangedCapability {
    pub list_changed: bool,
}

/// Resources capability information
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    pub subscribe: bool,
    pub list_changed: bool,
}

/// MCP initialization response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// MCP protocol version we support
    pub protocol_version: String,
    /// Our server capabilities
    pub capabilities: ServerCapabilities,
    /// Information about our server
    pub server_info: ServerInfo,
}

/// Information about the music toolkit server
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

// JSON-RPC error codes (standard codes)
pub mod error_codes {
    /// Parse error - Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The requested method (or tool) doesn't exist
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid parameters - Method exists but parameters are wrong
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message, data }),
        }
    }

    /// Create an error response from an already built error object
    pub fn from_error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
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

impl From<serde_json::Error> for JsonRpcError {
    fn from(e: serde_json::Error) -> Self {
        JsonRpcError::new(error_codes::INTERNAL_ERROR, format!("Internal error: {}", e))
    }
}

impl From<crate::tools::ToolError> for JsonRpcError {
    fn from(e: crate::tools::ToolError) -> Self {
        JsonRpcError::new(e.code(), e.to_string())
    }
}

impl ToolCallResult {
    /// Create a successful tool result with text content
    pub fn success(text: String) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
        }
    }

    /// Create a tool result flagged as an error
    ///
    /// The text is passed through as-is; soft failures already carry their
    /// failure marker.
    pub fn error(text: String) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: true,
        }
    }
}

impl ToolContent {
    pub fn text(text: String) -> Self {
        Self {
            content_type: "text".to_string(),
            text,
        }
    }
}

/// Static descriptor served on `GET` by the HTTP transport
pub fn server_descriptor(tool_names: &[&str]) -> Value {
    json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": format!("MCP {}", MCP_VERSION),
        "protocolVersion": MCP_VERSION,
        "tools": tool_names,
        "status": "healthy",
        "endpoints": {
            "mcp": "/mcp",
        }
    })
}
