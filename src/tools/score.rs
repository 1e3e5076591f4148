/// Tool for converting WAV recordings into music scores
///
/// This module implements the wav_to_music_score MCP tool.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ToolContext, ToolError, ToolOutcome, FAILURE_MARKER, WARNING_MARKER};
use crate::services::{svg_html_fragment, ServiceError};

/// Parameters for converting a WAV file to a score
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct WavToScoreParams {
    /// Path to the input WAV audio file
    pub wav_file_path: String,

    /// Whether to render the score as SVG
    #[serde(default = "default_render_svg")]
    pub render_svg: bool,
}

fn default_render_svg() -> bool {
    true
}

/// Convert a WAV file to MusicXML and optionally render it
pub async fn wav_to_music_score(ctx: &ToolContext, params: WavToScoreParams) -> Result<ToolOutcome, ToolError> {
    let wav_path = Path::new(&params.wav_file_path);
    if !tokio::fs::try_exists(wav_path).await.unwrap_or(false) {
        return Ok(ToolOutcome::failure(format!("WAV file not found: {}", params.wav_file_path)));
    }

    let musicxml_path = match transcribe(ctx, wav_path).await {
        Ok(path) => path,
        Err(ServiceError::Output(e)) => return Err(ToolError::Internal(e.to_string())),
        Err(e) => {
            warn!("Score conversion failed for {}: {}", wav_path.display(), e);
            return Ok(ToolOutcome::failure(format!("Error converting WAV to music score: {}", e)));
        }
    };

    let mut message = format!(
        "✅ Successfully generated MusicXML score from WAV file\n📁 MusicXML file: {}",
        musicxml_path.display()
    );

    if params.render_svg {
        match render(ctx, &musicxml_path).await {
            Ok(html) => {
                message.push_str("\n🎼 Score rendered successfully as SVG\n");
                message.push_str(&html);
            }
            Err(reason) => {
                message.push_str(&format!("\n{} SVG rendering failed: {}", WARNING_MARKER, reason));
            }
        }
    }

    Ok(ToolOutcome::Success(message))
}

/// Produce a MusicXML file for `wav_path` in the output directory
pub(crate) async fn transcribe(ctx: &ToolContext, wav_path: &Path) -> Result<PathBuf, ServiceError> {
    let musicxml_path = ctx.output.allocate("musicxml").await?;
    ctx.converter.convert(wav_path, &musicxml_path).await?;

    info!(
        converter = ctx.converter.name(),
        "Generated MusicXML {}",
        musicxml_path.display()
    );
    Ok(musicxml_path)
}

/// Render a MusicXML file into an embeddable HTML fragment
///
/// Errors come back as display text so callers can fold them into the
/// tool result.
pub(crate) async fn render(ctx: &ToolContext, musicxml_path: &Path) -> Result<String, String> {
    let renderer = ctx
        .renderer
        .as_ref()
        .ok_or_else(|| format!("{} Score API URL is not configured", FAILURE_MARKER))?;

    match renderer.render_svg(musicxml_path).await {
        Ok(svg) => Ok(svg_html_fragment(&svg)),
        Err(e) => {
            warn!("Score rendering failed: {}", e);
            Err(format!("{} {}", FAILURE_MARKER, e))
        }
    }
}
