/// Score rendering through the remote scoring API
///
/// The API takes a MusicXML document as a multipart upload and answers with
/// JSON carrying the rendered score as an `svg` string.

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ensure_success, ServiceError};

/// Renders a MusicXML file into SVG markup
#[async_trait]
pub trait ScoreRenderer: Send + Sync {
    async fn render_svg(&self, musicxml_path: &Path) -> Result<String, ServiceError>;
}

/// HTTP client for the scoring API
#[derive(Debug, Clone)]
pub struct ScoringClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    svg: String,
}

impl ScoringClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_error(&self, source: reqwest::Error) -> ServiceError {
        ServiceError::Request {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

#[async_trait]
impl ScoreRenderer for ScoringClient {
    #[instrument(level = "debug", skip(self), fields(endpoint = %self.endpoint))]
    async fn render_svg(&self, musicxml_path: &Path) -> Result<String, ServiceError> {
        let document = tokio::fs::read(musicxml_path).await?;
        let file_name = musicxml_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "score.musicxml".to_string());

        let part = Part::bytes(document)
            .file_name(file_name)
            .mime_str("application/vnd.recordare.musicxml+xml")
            .map_err(|e| self.request_error(e))?;
        let form = Form::new().part("file", part);

        debug!("Uploading MusicXML to scoring API");
        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = ensure_success(response).await?;

        let rendered: RenderResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse SVG: {}", e)))?;

        Ok(rendered.svg)
    }
}

/// Wrap SVG markup into an HTML fragment with the image inlined as base64
pub fn svg_html_fragment(svg: &str) -> String {
    let encoded = BASE64.encode(svg.as_bytes());
    format!(
        "<div style=\"background-color: white; padding: 10px; border-radius: 8px;\">\n    \
         <img src=\"data:image/svg+xml;base64,{}\" style=\"width:100%; max-height:600px;\" />\n\
         </div>",
        encoded
    )
}
