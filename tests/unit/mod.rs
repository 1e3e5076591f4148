
use std::sync::Arc;

use music_toolkit_mcp::*;
use serde_json::Value;
use tempfile::TempDir;

/// Dispatcher with the placeholder converter and no external services
pub fn offline_dispatcher(temp: &TempDir) -> McpDispatcher {
    let output = OutputDir::create(temp.path().join("output"), CleanupPolicy::Keep)
        .expect("Failed to create output dir");

    McpDispatcher::new(ToolContext {
        converter: ScoreConverter::Placeholder,
        renderer: None,
        generator: None,
        output: Arc::new(output),
    })
}

/// Send one request value and unwrap the response
pub async fn call(dispatcher: &McpDispatcher, request: Value) -> JsonRpcResponse {
    dispatcher
        .handle_value(request)
        .await
        .expect("Expected a response")
}

/// Text of the first content block of a tools/call result
pub fn result_text(response: &JsonRpcResponse) -> String {
    response.result.as_ref().expect("Expected a result")["content"][0]["text"]
        .as_str()
        .expect("Expected text content")
        .to_string()
}
