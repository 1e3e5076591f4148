/// MCP protocol implementation
///
/// This module handles the Model Context Protocol communication:
/// JSON-RPC message types, method dispatch and the two transports.

pub mod catalog;
pub mod dispatcher;
pub mod http;
pub mod protocol;
pub mod server;

// Re-export main types
pub use dispatcher::McpDispatcher;
pub use http::{build_router, AppState};
pub use server::McpServer;
