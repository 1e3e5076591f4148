/// Main entry point for the MusicToolkit MCP server
///
/// This file sets up logging, parses command line arguments, and starts the MCP server.
/// The server speaks JSON-RPC either over stdin/stdout or over HTTP.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use music_toolkit_mcp::config::{DEFAULT_TIMEOUT_SECS, DEFAULT_TRANSCRIBER};
use music_toolkit_mcp::{CleanupPolicy, ConverterChoice, MusicToolkitServer, ServerConfig, Transport};

/// Get the default output directory with robust fallback strategy
fn get_default_output_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        // 1. User's data directory (platform-specific)
        dirs::data_dir().map(|mut p| {
            p.push("music-toolkit");
            p.push("output");
            p
        }),
        // 2. User's home directory
        dirs::home_dir().map(|mut p| {
            p.push(".music_toolkit");
            p.push("output");
            p
        }),
        // 3. Current working directory (last resort)
        std::env::current_dir().ok().map(|mut p| {
            p.push("output");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        // Try to create the directory
        if let Ok(()) = std::fs::create_dir_all(potential_path) {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file); // Clean up test file
                return Ok(potential_path.clone());
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("music_toolkit_output");
    std::fs::create_dir_all(&temp_path)?;

    tracing::warn!("Using temporary directory for output: {}", temp_path.display());
    Ok(temp_path)
}

/// Command line arguments for the MusicToolkit MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Transport to serve MCP on
    #[arg(long, value_enum, default_value_t = Transport::Stdio, env = "MUSIC_TOOLKIT_TRANSPORT")]
    transport: Transport,

    /// Address to bind when using the HTTP transport
    #[arg(long, default_value = "127.0.0.1", env = "MUSIC_TOOLKIT_HOST")]
    host: IpAddr,

    /// Port to bind when using the HTTP transport
    #[arg(long, default_value_t = 8080, env = "PORT")]
    port: u16,

    /// Scoring API endpoint that renders MusicXML to SVG
    #[arg(long, env = "MUSIC_TOOLKIT_SCORE_API_URL")]
    score_api_url: Option<String>,

    /// Music generation API endpoint
    #[arg(long, env = "MUSIC_TOOLKIT_MUSICGEN_API_URL")]
    musicgen_api_url: Option<String>,

    /// Timeout in seconds for every external API call
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "MUSIC_TOOLKIT_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// Directory for generated scores and audio
    /// If not provided, uses a default location in the user's data directory
    #[arg(long, env = "MUSIC_TOOLKIT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Cleanup policy for generated files: keep, remove-on-exit or expire:<seconds>
    #[arg(long, default_value = "keep", env = "MUSIC_TOOLKIT_CLEANUP")]
    cleanup: CleanupPolicy,

    /// How to convert audio into MusicXML
    #[arg(long, value_enum, default_value_t = ConverterChoice::Auto, env = "MUSIC_TOOLKIT_CONVERTER")]
    converter: ConverterChoice,

    /// Transcription program used by the precise converter
    #[arg(long, default_value = DEFAULT_TRANSCRIBER, env = "MUSIC_TOOLKIT_TRANSCRIBER")]
    transcriber: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging based on command line flags
    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("music_toolkit_mcp={},tower_http={}", log_level, log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // Send logs to stderr, not stdout
        .init();

    info!("Starting MusicToolkit MCP server");

    let output_dir = match args.output_dir {
        Some(path) => path,
        None => get_default_output_dir()?,
    };

    info!("Using output directory: {}", output_dir.display());

    let config = ServerConfig {
        transport: args.transport,
        bind: SocketAddr::new(args.host, args.port),
        score_api_url: args.score_api_url,
        musicgen_api_url: args.musicgen_api_url,
        timeout: Duration::from_secs(args.timeout_secs),
        output_dir,
        cleanup: args.cleanup,
        converter: args.converter,
        transcriber: args.transcriber,
    };

    // Create and start the music toolkit server
    let server = MusicToolkitServer::new(config)?;
    server.run().await?;

    info!("MusicToolkit MCP server shutdown complete");
    Ok(())
}
