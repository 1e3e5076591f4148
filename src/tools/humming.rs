/// Tool for generating music from a humming sample
///
/// This module implements the generate_music_from_humming MCP tool. The
/// heavy lifting happens in the remote generation API; this side uploads the
/// sample, stores the result and can chain into score conversion.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::score::{render, transcribe};
use super::{ToolContext, ToolError, ToolOutcome, WARNING_MARKER};
use crate::services::ServiceError;

/// Parameters for generating music from humming
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct HummingParams {
    /// Path to the humming audio file (.wav)
    pub humming_file_path: String,

    /// Text prompt describing the desired music style (e.g., 'upbeat pop song', 'classical piano piece')
    pub style_prompt: String,

    /// Whether to also generate a music score from the result
    #[serde(default)]
    pub generate_score: bool,
}

/// Generate music from a humming sample and optionally score it
pub async fn generate_music_from_humming(
    ctx: &ToolContext,
    params: HummingParams,
) -> Result<ToolOutcome, ToolError> {
    let humming_path = Path::new(&params.humming_file_path);
    if !tokio::fs::try_exists(humming_path).await.unwrap_or(false) {
        return Ok(ToolOutcome::failure(format!(
            "Humming file not found: {}",
            params.humming_file_path
        )));
    }

    let Some(generator) = ctx.generator.as_ref() else {
        return Ok(ToolOutcome::failure("Music generation API URL is not configured"));
    };

    let wav_out_path = ctx
        .output
        .allocate("wav")
        .await
        .map_err(|e| ToolError::Internal(e.to_string()))?;

    info!(prompt = %params.style_prompt, "Generating music from {}", humming_path.display());
    if let Err(e) = generator
        .generate(humming_path, &params.style_prompt, &wav_out_path)
        .await
    {
        warn!("Music generation failed: {}", e);
        // Don't leave a truncated file behind
        let _ = tokio::fs::remove_file(&wav_out_path).await;

        return Ok(match e {
            ServiceError::Status { .. } => ToolOutcome::failure(e.to_string()),
            other => ToolOutcome::failure(format!("Music generation failed: {}", other)),
        });
    }

    let mut message = format!(
        "✅ Successfully generated music from humming\n📁 Generated music file: {}\n🎵 Style: {}",
        wav_out_path.display(),
        params.style_prompt
    );

    if params.generate_score {
        match transcribe(ctx, &wav_out_path).await {
            Ok(score_path) => {
                message.push_str(&format!("\n🎼 Music score generated: {}", score_path.display()));
                if let Ok(html) = render(ctx, &score_path).await {
                    message.push_str("\n🎼 Score rendered as SVG:\n");
                    message.push_str(&html);
                }
            }
            Err(e) => {
                message.push_str(&format!("\n{} Score generation failed: {}", WARNING_MARKER, e));
            }
        }
    }

    Ok(ToolOutcome::Success(message))
}
