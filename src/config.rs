/// Server configuration
///
/// External endpoints, timeouts and the output directory are all injected
/// here rather than compiled in, so tests and deployments can point the
/// server at whatever services they like.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use thiserror::Error;

use crate::output::CleanupPolicy;
use crate::services::ConverterChoice;

/// Default timeout applied to every external HTTP call
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default transcription program looked up for the precise converter
pub const DEFAULT_TRANSCRIBER: &str = "music-transcribe";

/// Errors in the supplied configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL for {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,
}

/// Which transport the server speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

/// Complete runtime configuration for the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: Transport,
    pub bind: SocketAddr,
    /// Scoring API endpoint; score rendering is unavailable when `None`
    pub score_api_url: Option<String>,
    /// Music generation API endpoint; generation is unavailable when `None`
    pub musicgen_api_url: Option<String>,
    pub timeout: Duration,
    pub output_dir: PathBuf,
    pub cleanup: CleanupPolicy,
    pub converter: ConverterChoice,
    pub transcriber: String,
}

impl ServerConfig {
    /// Configuration with no external services, writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport: Transport::Stdio,
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            score_api_url: None,
            musicgen_api_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            output_dir: output_dir.into(),
            cleanup: CleanupPolicy::Keep,
            converter: ConverterChoice::Auto,
            transcriber: DEFAULT_TRANSCRIBER.to_string(),
        }
    }

    pub fn with_score_api(mut self, url: impl Into<String>) -> Self {
        self.score_api_url = Some(url.into());
        self
    }

    pub fn with_musicgen_api(mut self, url: impl Into<String>) -> Self {
        self.musicgen_api_url = Some(url.into());
        self
    }

    /// Check the configuration before anything is started
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        for (name, url) in [
            ("score API", &self.score_api_url),
            ("music generation API", &self.musicgen_api_url),
        ] {
            if let Some(url) = url {
                let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
                    name,
                    reason: e.to_string(),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidUrl {
                        name,
                        reason: format!("unsupported scheme '{}'", parsed.scheme()),
                    });
                }
            }
        }

        Ok(())
    }
}
