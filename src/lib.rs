/// Public library interface for the MusicToolkit MCP server
///
/// This module exports the main server implementation and public types
/// that can be used by other applications or tests.

use std::sync::Arc;
use thiserror::Error;

// Internal modules
pub mod config;
pub mod mcp;
pub mod output;
pub mod services;
pub mod tools;

// Re-export public modules and types
pub use config::{ConfigError, ServerConfig, Transport};
pub use mcp::protocol::{error_codes, JsonRpcError, JsonRpcResponse};
pub use mcp::{build_router, AppState, McpDispatcher};
pub use output::{CleanupPolicy, OutputDir, OutputError};
pub use services::{ConverterChoice, MusicGenerator, ScoreConverter, ScoreRenderer, ServiceError};
pub use tools::{ToolContext, ToolError, ToolKind, ToolOutcome, FAILURE_MARKER};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output directory error: {0}")]
    Output(#[from] OutputError),

    #[error("Service setup error: {0}")]
    Service(#[from] ServiceError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main music toolkit server that implements the MCP protocol
///
/// Wires the configured external services, the converter and the output
/// directory into a dispatcher, then serves it over the chosen transport.
pub struct MusicToolkitServer {
    config: ServerConfig,
    dispatcher: Arc<McpDispatcher>,
}

impl MusicToolkitServer {
    /// Create a new server from its configuration
    ///
    /// This validates the configuration, creates the output directory and
    /// selects the score converter.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        tracing::info!("Initializing MusicToolkit server with output directory: {:?}", config.output_dir);

        config.validate()?;

        let output = Arc::new(OutputDir::create(&config.output_dir, config.cleanup)?);
        let converter = ScoreConverter::select(config.converter, &config.transcriber)?;
        let http = services::http_client(config.timeout)?;

        let renderer = config.score_api_url.as_ref().map(|url| {
            Arc::new(services::ScoringClient::new(http.clone(), url.clone())) as Arc<dyn ScoreRenderer>
        });
        let generator = config.musicgen_api_url.as_ref().map(|url| {
            Arc::new(services::MusicGenClient::new(http.clone(), url.clone())) as Arc<dyn MusicGenerator>
        });

        if renderer.is_none() {
            tracing::warn!("No score API configured, SVG rendering is disabled");
        }
        if generator.is_none() {
            tracing::warn!("No music generation API configured, generation is disabled");
        }

        let tools = ToolContext {
            converter,
            renderer,
            generator,
            output,
        };

        Ok(Self {
            config,
            dispatcher: Arc::new(McpDispatcher::new(tools)),
        })
    }

    /// Run the MCP server on the configured transport
    ///
    /// This method will block until the server is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(
            transport = ?self.config.transport,
            converter = self.dispatcher.tools().converter.name(),
            "Starting MCP server..."
        );

        match self.config.transport {
            Transport::Stdio => mcp::McpServer::new(self.dispatcher).run().await,
            Transport::Http => mcp::http::serve(self.dispatcher, self.config.bind).await,
        }
    }

    /// Get the request dispatcher (useful for testing)
    pub fn dispatcher(&self) -> Arc<McpDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
