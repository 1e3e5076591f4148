/// JSON-RPC request dispatcher shared by every transport
///
/// Takes one request, produces at most one response and never lets an
/// error or panic escape. Each call is independent: there is no session
/// state, so `initialize` does not gate the other methods.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::mcp::catalog;
use crate::mcp::protocol::*;
use crate::tools::{ToolContext, ToolError, ToolKind};

/// Routes MCP methods to their handlers
pub struct McpDispatcher {
    tools: ToolContext,
}

impl McpDispatcher {
    pub fn new(tools: ToolContext) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolContext {
        &self.tools
    }

    /// Parse and handle one serialized request
    ///
    /// Returns `None` for notifications, which get no response.
    pub async fn handle_str(&self, input: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(input) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                Some(JsonRpcResponse::error(
                    json!(0),
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                    None,
                ))
            }
        }
    }

    /// Handle one request that is already valid JSON
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        if !value.is_object() {
            return Some(JsonRpcResponse::error(
                json!(0),
                error_codes::INVALID_REQUEST,
                "Invalid request: expected a JSON object".to_string(),
                None,
            ));
        }

        let id = value.get("id").filter(|id| !id.is_null()).cloned();

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id.unwrap_or(json!(0)),
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                    None,
                ));
            }
        };

        if let Some(version) = request.jsonrpc.as_deref().filter(|v| *v != JSONRPC_VERSION) {
            return Some(JsonRpcResponse::error(
                id.unwrap_or(json!(0)),
                error_codes::INVALID_REQUEST,
                format!("Invalid request: unsupported jsonrpc version '{}'", version),
                None,
            ));
        }

        let Some(method) = request.method else {
            return Some(JsonRpcResponse::error(
                id.unwrap_or(json!(0)),
                error_codes::METHOD_NOT_FOUND,
                "Method not found: request has no method".to_string(),
                None,
            ));
        };

        if id.is_none() && method.starts_with("notifications/") {
            debug!("Received notification {}", method);
            return None;
        }

        let id = id.unwrap_or(json!(0));
        debug!(%method, %id, "Dispatching request");

        let outcome = AssertUnwindSafe(self.route(&method, request.params))
            .catch_unwind()
            .await;

        Some(match outcome {
            Ok(Ok(result)) => JsonRpcResponse::success(id, result),
            Ok(Err(e)) => {
                warn!(%method, code = e.code, "Request failed: {}", e.message);
                JsonRpcResponse::from_error(id, e)
            }
            Err(_) => {
                error!(%method, "Handler panicked");
                JsonRpcResponse::error(
                    id,
                    error_codes::INTERNAL_ERROR,
                    format!("Internal error: handler for '{}' panicked", method),
                    None,
                )
            }
        })
    }

    async fn route(&self, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => self.handle_initialize(),
            "initialized" | "ping" => Ok(json!({})),
            m if m.starts_with("notifications/") => Ok(json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": catalog::resources() })),
            "resources/read" => self.handle_resources_read(params).await,
            "prompts/list" => Ok(json!({ "prompts": catalog::prompts() })),
            "prompts/get" => self.handle_prompts_get(params),
            other => Err(JsonRpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }

    /// Handle MCP initialization request
    fn handle_initialize(&self) -> Result<Value, JsonRpcError> {
        info!("MCP client connected");

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ListChangedCapability { list_changed: false },
                resources: ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                },
                prompts: ListChangedCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle tools/list request
    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        let tools: Vec<ToolDefinition> = ToolKind::ALL.into_iter().map(ToolKind::definition).collect();
        Ok(json!({ "tools": tools }))
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let tool_params: ToolCallParams = parse_params(params)?;
        let name = tool_params
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ToolError::MissingParameter("name".to_string()))?;

        info!(tool = %name, "Calling tool");
        let outcome = self
            .tools
            .call(&name, tool_params.arguments.unwrap_or_default())
            .await?;

        if outcome.is_failure() {
            warn!(tool = %name, "Tool reported a failure");
        }

        Ok(serde_json::to_value(outcome.into_call_result())?)
    }

    /// Handle resources/read request
    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let read_params: ResourceReadParams = parse_params(params)?;
        let uri = read_params
            .uri
            .ok_or_else(|| ToolError::MissingParameter("uri".to_string()))?;

        if uri != catalog::OUTPUT_RESOURCE_URI {
            return Err(JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Unknown resource: {}", uri),
            ));
        }

        let contents = ResourceContents {
            uri,
            mime_type: "text/plain".to_string(),
            text: catalog::describe_output(&self.tools.output).await,
        };

        Ok(json!({ "contents": [contents] }))
    }

    /// Handle prompts/get request
    fn handle_prompts_get(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let get_params: PromptGetParams = parse_params(params)?;
        let name = get_params
            .name
            .ok_or_else(|| ToolError::MissingParameter("name".to_string()))?;

        if name != catalog::MUSIC_PROCESSING_PROMPT {
            return Err(JsonRpcError::new(
                error_codes::INVALID_PARAMS,
                format!("Unknown prompt: {}", name),
            ));
        }

        let message = PromptMessage {
            role: "user".to_string(),
            content: ToolContent::text(catalog::render_music_processing_prompt(&get_params.arguments)),
        };

        Ok(json!({
            "description": "AI assistant for music processing and generation tasks",
            "messages": [message],
        }))
    }
}

/// Deserialize method params, treating absent params as an empty object
fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(params).map_err(|e| {
        JsonRpcError::new(error_codes::INVALID_PARAMS, format!("Invalid parameters: {}", e))
    })
}
