//! 预定义流水线：随库打包的 JSON 流水线，以及从本地文件加载流水线。
//!
//! Predefined pipelines and pipeline-file loading.
//!
//! Predefined pipelines are bundled into the library at compile time and addressed by a
//! symbolic name (`simple_parser`, `advanced_parser`, ...). Pipeline files can be JSON
//! or YAML. Neither path touches the network.

use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A pipeline definition shipped with the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedPipeline {
    /// Webhook → parse → response.
    SimpleParser,
    /// Webhook → parse + OCR → chunking → response.
    AdvancedParser,
    /// Webhook → audio transcription → response.
    AudioTranscribe,
    /// Local filesystem source → parse → index. Not webhook-fed.
    FilesystemIndexer,
}

impl PredefinedPipeline {
    pub const ALL: [PredefinedPipeline; 4] = [
        PredefinedPipeline::SimpleParser,
        PredefinedPipeline::AdvancedParser,
        PredefinedPipeline::AudioTranscribe,
        PredefinedPipeline::FilesystemIndexer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PredefinedPipeline::SimpleParser => "simple_parser",
            PredefinedPipeline::AdvancedParser => "advanced_parser",
            PredefinedPipeline::AudioTranscribe => "audio_transcribe",
            PredefinedPipeline::FilesystemIndexer => "filesystem_indexer",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            PredefinedPipeline::SimpleParser => include_str!("../../pipelines/simple_parser.json"),
            PredefinedPipeline::AdvancedParser => {
                include_str!("../../pipelines/advanced_parser.json")
            }
            PredefinedPipeline::AudioTranscribe => {
                include_str!("../../pipelines/audio_transcribe.json")
            }
            PredefinedPipeline::FilesystemIndexer => {
                include_str!("../../pipelines/filesystem_indexer.json")
            }
        }
    }

    /// Parse the bundled document.
    pub fn load(&self) -> Result<Value> {
        serde_json::from_str(self.source()).map_err(|e| {
            Error::configuration_with_context(
                format!("Bundled pipeline '{}' is not valid JSON: {e}", self.name()),
                ErrorContext::new().with_source("predefined_pipeline"),
            )
        })
    }
}

impl fmt::Display for PredefinedPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PredefinedPipeline {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                Error::input_with_context(
                    format!("Unknown predefined pipeline: {}", s),
                    ErrorContext::new()
                        .with_field_path("pipeline")
                        .with_details(format!("known pipelines: {}", known.join(", "))),
                )
            })
    }
}

/// Load a pipeline document from a `.json`, `.yaml` or `.yml` file.
///
/// Files with any other extension are tried as JSON first, then as YAML.
pub fn load_pipeline_file(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let invalid = |e: &dyn fmt::Display| {
        Error::input_with_context(
            format!("Invalid pipeline file: {}", e),
            ErrorContext::new()
                .with_field_path(path.display().to_string())
                .with_source("pipeline_loader"),
        )
    };

    match ext.as_deref() {
        Some("json") => serde_json::from_str(&content).map_err(|e| invalid(&e)),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| invalid(&e)),
        _ => serde_json::from_str(&content)
            .or_else(|_| serde_yaml::from_str(&content))
            .map_err(|e| invalid(&e)),
    }
}

/// Resolve a pipeline argument: a predefined pipeline name, or else a file path.
pub fn resolve_pipeline(arg: &str) -> Result<Value> {
    if Path::new(arg).is_file() {
        return load_pipeline_file(arg);
    }
    arg.parse::<PredefinedPipeline>()?.load()
}
