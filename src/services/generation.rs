/// Music generation through the remote inference API
///
/// The API receives the humming sample as a multipart `melody` upload plus a
/// `text` style prompt. Depending on the deployment it answers either with the
/// generated audio itself or with JSON pointing at it (`audio_url`); both are
/// handled here and end up streamed into a local file.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::{ensure_success, ServiceError};

/// Generates music from a melody sample and a style prompt
#[async_trait]
pub trait MusicGenerator: Send + Sync {
    /// Generate audio into `destination`, returning the number of bytes written
    async fn generate(
        &self,
        melody_path: &Path,
        prompt: &str,
        destination: &Path,
    ) -> Result<u64, ServiceError>;
}

/// HTTP client for the music generation API
#[derive(Debug, Clone)]
pub struct MusicGenClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    audio_url: Option<String>,
}

impl MusicGenClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Follow a JSON `audio_url` answer to the actual audio
    async fn fetch_audio(&self, response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse generation response: {}", e)))?;

        let audio_url = body
            .audio_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ServiceError::InvalidResponse("Generation response has no audio_url".to_string()))?;

        debug!(%audio_url, "Downloading generated audio");
        let response = self
            .http
            .get(&audio_url)
            .send()
            .await
            .map_err(|source| ServiceError::Request {
                endpoint: audio_url.clone(),
                source,
            })?;

        ensure_success(response).await
    }
}

#[async_trait]
impl MusicGenerator for MusicGenClient {
    #[instrument(level = "debug", skip(self, prompt), fields(endpoint = %self.endpoint))]
    async fn generate(
        &self,
        melody_path: &Path,
        prompt: &str,
        destination: &Path,
    ) -> Result<u64, ServiceError> {
        let melody = tokio::fs::read(melody_path).await?;
        let request_error = |source| ServiceError::Request {
            endpoint: self.endpoint.clone(),
            source,
        };

        let part = Part::bytes(melody)
            .file_name("hum.wav")
            .mime_str("audio/wav")
            .map_err(request_error)?;
        let form = Form::new().part("melody", part).text("text", prompt.to_string());

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;
        let response = ensure_success(response).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        let response = if is_json {
            self.fetch_audio(response).await?
        } else {
            response
        };

        let written = stream_to_file(response, destination).await?;
        info!(bytes = written, path = %destination.display(), "Saved generated audio");
        Ok(written)
    }
}

/// Stream a response body into a file without buffering it whole
async fn stream_to_file(response: reqwest::Response, destination: &Path) -> Result<u64, ServiceError> {
    let endpoint = response.url().to_string();
    let mut file = tokio::fs::File::create(destination).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| ServiceError::Request {
            endpoint: endpoint.clone(),
            source,
        })?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
