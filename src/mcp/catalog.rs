/// Static resources and prompts advertised next to the tools

use serde_json::{Map, Value};

use crate::mcp::protocol::{PromptArgument, PromptDefinition, ResourceDefinition};
use crate::output::OutputDir;

/// URI of the generated-files listing
pub const OUTPUT_RESOURCE_URI: &str = "musictoolkit://output";

/// Name of the only prompt
pub const MUSIC_PROCESSING_PROMPT: &str = "music_processing";

pub fn resources() -> Vec<ResourceDefinition> {
    vec![ResourceDefinition {
        uri: OUTPUT_RESOURCE_URI.to_string(),
        name: "Generated Files".to_string(),
        description: "List of generated music files and scores".to_string(),
        mime_type: "text/plain".to_string(),
    }]
}

pub fn prompts() -> Vec<PromptDefinition> {
    let argument = |name: &str, description: &str| PromptArgument {
        name: name.to_string(),
        description: description.to_string(),
        required: false,
    };

    vec![PromptDefinition {
        name: MUSIC_PROCESSING_PROMPT.to_string(),
        description: "AI assistant for music processing and generation tasks".to_string(),
        arguments: vec![
            argument("task_type", "Type of music processing task"),
            argument("input_description", "Description of the input audio/music"),
            argument("desired_output", "Description of desired output"),
        ],
    }]
}

/// Human-readable listing of the output directory
pub async fn describe_output(output: &OutputDir) -> String {
    let files = match output.list().await {
        Ok(files) => files,
        Err(e) => return format!("Error listing generated files: {}", e),
    };

    if files.is_empty() {
        return "Output directory is empty. No files have been generated yet.".to_string();
    }

    let mut text = String::from("Generated Files:\n\n");
    for file in files {
        text.push_str(&format!(
            "📁 {}\n   Size: {} bytes\n   Modified: {}\n\n",
            file.name,
            file.size,
            file.modified.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    text
}

/// Render the music processing prompt with the caller's arguments
///
/// Missing arguments are left as a visible placeholder rather than rejected.
pub fn render_music_processing_prompt(arguments: &Map<String, Value>) -> String {
    let arg = |name: &str| {
        arguments
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or("(not specified)")
            .to_string()
    };

    format!(
        "You are an AI music processing assistant for MusicToolkit. Help with music analysis and generation tasks.

🎵 Task Type: {}
🎤 Input: {}
🎯 Desired Output: {}

Available capabilities:
1. WAV to MusicXML conversion
2. Music score rendering as SVG images
3. AI music generation from humming audio
4. Style-based music transformation

Please suggest:
1. Best approach for the given task
2. Recommended parameters and settings
3. Expected output quality and limitations
4. Alternative processing methods if applicable
5. Post-processing suggestions

Focus on practical, actionable advice for music processing workflows.",
        arg("task_type"),
        arg("input_description"),
        arg("desired_output")
    )
}
