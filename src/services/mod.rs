/// Clients for the external services the tools delegate to
///
/// Score rendering and music generation live in remote HTTP APIs; audio to
/// notation conversion is either a placeholder or an external program.
/// The traits here are the seams the tools call through, so tests and
/// alternative deployments can substitute their own implementations.

pub mod converter;
pub mod generation;
pub mod scoring;

pub use converter::{ConverterChoice, ScoreConverter};
pub use generation::{MusicGenClient, MusicGenerator};
pub use scoring::{svg_html_fragment, ScoreRenderer, ScoringClient};

use std::time::Duration;
use thiserror::Error;

use crate::output::OutputError;

/// Errors raised while talking to an external service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Converter error: {0}")]
    Converter(String),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Build the HTTP client shared by every service client
///
/// One timeout covers every external call, whichever service it targets.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Turn a non-success response into a `ServiceError::Status`
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}
