/// MCP server over stdin/stdout
///
/// This module implements the line-oriented transport that:
/// 1. Reads JSON-RPC requests from stdin, one per line
/// 2. Hands each one to the dispatcher
/// 3. Writes JSON-RPC responses to stdout

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::mcp::dispatcher::McpDispatcher;
use crate::ServerError;

/// MCP server that talks JSON-RPC over stdio
pub struct McpServer {
    dispatcher: Arc<McpDispatcher>,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(dispatcher: Arc<McpDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests on stdin...");

        let reader = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(reader, stdout).await
    }

    /// Serve requests from any line reader until it reaches end of input
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (input closed)");
                    break;
                }
                Ok(_) => {
                    let request = line.trim();
                    if request.is_empty() {
                        continue;
                    }

                    debug!("Processing request: {}", request);
                    if let Some(response) = self.dispatcher.handle_str(request).await {
                        let response_str = serde_json::to_string(&response)?;

                        // Write response + newline
                        writer.write_all(response_str.as_bytes()).await?;
                        writer.write_all(b"\n").await?;
                        writer.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read request: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }
}
