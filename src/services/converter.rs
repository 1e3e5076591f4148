/// Audio to MusicXML conversion strategies
///
/// Real transcription (pitch detection and note quantization) is not done in
/// this crate. It is either delegated to an external transcription program or
/// replaced by a fixed placeholder score. Which one is used is decided once at
/// startup.

use std::env;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::ValueEnum;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::ServiceError;

/// How the converter should be picked at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConverterChoice {
    /// Use the transcription program when it is installed, else the placeholder
    #[default]
    Auto,
    /// Always write the placeholder score
    Placeholder,
    /// Require the transcription program
    Precise,
}

/// The converter selected for this server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreConverter {
    /// Writes a fixed four-note score regardless of the input audio
    Placeholder,
    /// Runs `<program> <input.wav> <output.musicxml>`
    Precise { program: PathBuf },
}

impl ScoreConverter {
    /// Select a converter, checking whether the transcription program exists
    pub fn select(choice: ConverterChoice, program: &str) -> Result<Self, ServiceError> {
        let found = find_program(program);

        match (choice, found) {
            (ConverterChoice::Placeholder, _) => Ok(ScoreConverter::Placeholder),
            (ConverterChoice::Auto, Some(program)) | (ConverterChoice::Precise, Some(program)) => {
                info!("Using transcription program {}", program.display());
                Ok(ScoreConverter::Precise { program })
            }
            (ConverterChoice::Auto, None) => {
                warn!(
                    "Transcription program '{}' not found, scores will use a placeholder melody",
                    program
                );
                Ok(ScoreConverter::Placeholder)
            }
            (ConverterChoice::Precise, None) => Err(ServiceError::Converter(format!(
                "transcription program '{}' not found",
                program
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoreConverter::Placeholder => "placeholder",
            ScoreConverter::Precise { .. } => "precise",
        }
    }

    /// Convert `wav_path` into a MusicXML document written to `destination`
    pub async fn convert(&self, wav_path: &Path, destination: &Path) -> Result<(), ServiceError> {
        match self {
            ScoreConverter::Placeholder => {
                let title = wav_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "Generated Music".to_string());
                tokio::fs::write(destination, placeholder_musicxml(&title)).await?;
                debug!("Wrote placeholder score to {}", destination.display());
                Ok(())
            }
            ScoreConverter::Precise { program } => {
                let output = Command::new(program)
                    .arg(wav_path)
                    .arg(destination)
                    .output()
                    .await?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(ServiceError::Converter(format!(
                        "{} exited with {}: {}",
                        program.display(),
                        output.status,
                        stderr.trim()
                    )));
                }

                if !tokio::fs::try_exists(destination).await.unwrap_or(false) {
                    return Err(ServiceError::Converter(format!(
                        "{} produced no MusicXML output",
                        program.display()
                    )));
                }

                Ok(())
            }
        }
    }
}

/// Resolve a program name against `PATH`, or check an explicit path directly
fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}

/// Build the placeholder MusicXML 3.1 score
///
/// One 4/4 measure in C major, treble clef, with C4 D4 E4 F4 quarter notes.
pub fn placeholder_musicxml(title: &str) -> String {
    let notes: String = ["C", "D", "E", "F"]
        .iter()
        .map(|step| {
            format!(
                "      <note>\n        <pitch>\n          <step>{}</step>\n          <octave>4</octave>\n        </pitch>\n        <duration>1</duration>\n        <type>quarter</type>\n      </note>\n",
                step
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1">
  <work>
    <work-title>{title}</work-title>
  </work>
  <identification>
    <encoding>
      <software>{software}</software>
      <encoding-date>{date}</encoding-date>
    </encoding>
  </identification>
  <part-list>
    <score-part id="P1">
      <part-name>Generated from Audio</part-name>
    </score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>1</divisions>
        <key>
          <fifths>0</fifths>
        </key>
        <time>
          <beats>4</beats>
          <beat-type>4</beat-type>
        </time>
        <clef>
          <sign>G</sign>
          <line>2</line>
        </clef>
      </attributes>
{notes}    </measure>
  </part>
</score-partwise>
"#,
        title = escape_xml(title),
        software = env!("CARGO_PKG_NAME"),
        date = Local::now().format("%Y-%m-%d"),
        notes = notes,
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
