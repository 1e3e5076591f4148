/// MCP tools for music processing
///
/// This module contains the tools that external clients can call: the
/// registry that maps tool names to handlers, the typed outcome every handler
/// returns, and the shared context the handlers run against.

pub mod humming;
pub mod score;

pub use humming::*;
pub use score::*;

use std::sync::Arc;

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::mcp::protocol::{error_codes, ToolCallResult, ToolDefinition};
use crate::output::OutputDir;
use crate::services::{MusicGenerator, ScoreConverter, ScoreRenderer};

/// Marker that starts the text of every soft failure
pub const FAILURE_MARKER: &str = "❌";

/// Marker for partial failures appended to an otherwise successful result
pub const WARNING_MARKER: &str = "⚠️";

/// Result of a tool that ran to completion
///
/// A soft failure is still a successful JSON-RPC response; the client sees
/// the failure in the tool text instead of as a protocol error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    SoftFailure(String),
}

impl ToolOutcome {
    /// Soft failure with the failure marker prepended
    pub fn failure(message: impl AsRef<str>) -> Self {
        ToolOutcome::SoftFailure(format!("{} {}", FAILURE_MARKER, message.as_ref()))
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success(text) | ToolOutcome::SoftFailure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::SoftFailure(_))
    }

    pub fn into_call_result(self) -> ToolCallResult {
        match self {
            ToolOutcome::Success(text) => ToolCallResult::success(text),
            ToolOutcome::SoftFailure(text) => ToolCallResult::error(text),
        }
    }
}

/// Tool failures that surface as JSON-RPC errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i32 {
        match self {
            ToolError::MissingParameter(_) | ToolError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            ToolError::UnknownTool(_) => error_codes::METHOD_NOT_FOUND,
            ToolError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

/// The fixed set of tools this server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    WavToScore,
    HumToMusic,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::WavToScore, ToolKind::HumToMusic];

    pub fn from_name(name: &str) -> Option<Self> {
        ToolKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::WavToScore => "wav_to_music_score",
            ToolKind::HumToMusic => "generate_music_from_humming",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::WavToScore => {
                "Convert a WAV audio file to a MusicXML score and render it as an SVG image"
            }
            ToolKind::HumToMusic => {
                "Generate full music from a humming audio file using AI music generation"
            }
        }
    }

    /// Descriptor advertised by `tools/list`
    pub fn definition(self) -> ToolDefinition {
        let input_schema = match self {
            ToolKind::WavToScore => input_schema::<WavToScoreParams>(),
            ToolKind::HumToMusic => input_schema::<HummingParams>(),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema,
        }
    }

    /// Fields that must be present and non-empty for this tool
    pub fn required_parameters(self) -> &'static [&'static str] {
        match self {
            ToolKind::WavToScore => &["wav_file_path"],
            ToolKind::HumToMusic => &["humming_file_path", "style_prompt"],
        }
    }
}

/// Everything a tool handler needs to do its work
#[derive(Clone)]
pub struct ToolContext {
    pub converter: ScoreConverter,
    /// `None` when no scoring API is configured
    pub renderer: Option<Arc<dyn ScoreRenderer>>,
    /// `None` when no generation API is configured
    pub generator: Option<Arc<dyn MusicGenerator>>,
    pub output: Arc<OutputDir>,
}

impl ToolContext {
    /// Run the tool identified by `name` with the raw call arguments
    pub async fn call(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolOutcome, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        match kind {
            ToolKind::WavToScore => {
                let params = parse_arguments(kind, arguments)?;
                wav_to_music_score(self, params).await
            }
            ToolKind::HumToMusic => {
                let params = parse_arguments(kind, arguments)?;
                generate_music_from_humming(self, params).await
            }
        }
    }
}

/// Check required fields, then deserialize the arguments into typed params
///
/// A field counts as missing when it is absent, null or an empty string.
fn parse_arguments<T: DeserializeOwned>(kind: ToolKind, arguments: Map<String, Value>) -> Result<T, ToolError> {
    for field in kind.required_parameters() {
        let present = match arguments.get(*field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(ToolError::MissingParameter(field.to_string()));
        }
    }

    serde_json::from_value(Value::Object(arguments)).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// JSON schema for a parameter struct, inlined and without the meta-schema
fn input_schema<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.meta_schema = None;
        })
        .into_generator();

    let schema = generator.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    if let Some(object) = value.as_object_mut() {
        object.remove("title");
    }
    value
}
