//! Pipeline payload normalization.
//!
//! Callers hand the client either a bare pipeline graph or a document already wrapped
//! as `{pipeline, errors, warnings}`. The service only accepts the wrapped shape, so
//! every submission goes through [`normalize`] first.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const PIPELINE_KEY: &str = "pipeline";
const ERRORS_KEY: &str = "errors";
const WARNINGS_KEY: &str = "warnings";

/// Canonical submission envelope.
///
/// `errors` and `warnings` are kept as raw JSON so that caller-populated values are
/// passed through untouched, whatever their shape. Unknown top-level keys of a
/// pre-wrapped document survive in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedPipeline {
    pub pipeline: Value,
    #[serde(default = "empty_sequence")]
    pub errors: Value,
    #[serde(default = "empty_sequence")]
    pub warnings: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn empty_sequence() -> Value {
    Value::Array(Vec::new())
}

impl WrappedPipeline {
    /// Wrap a bare pipeline graph.
    pub fn new(pipeline: Value) -> Self {
        Self {
            pipeline,
            errors: empty_sequence(),
            warnings: empty_sequence(),
            extra: Map::new(),
        }
    }

    /// The pipeline's declared input source (`pipeline.source`), if it names one.
    pub fn source(&self) -> Option<&str> {
        self.pipeline.get("source").and_then(Value::as_str)
    }

    /// Webhook pipelines expect files to be pushed to them once the task is running.
    pub fn is_webhook(&self) -> bool {
        self.source()
            .map(|source| source.starts_with("webhook"))
            .unwrap_or(false)
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert(PIPELINE_KEY.to_string(), self.pipeline.clone());
        map.insert(ERRORS_KEY.to_string(), self.errors.clone());
        map.insert(WARNINGS_KEY.to_string(), self.warnings.clone());
        Value::Object(map)
    }
}

/// Bring a caller-supplied pipeline document into the wrapped submission shape.
///
/// A document carrying a `pipeline` key is treated as pre-wrapped: missing `errors` and
/// `warnings` are filled with empty arrays and existing ones are left alone. Anything
/// else becomes the `pipeline` of a fresh envelope. Pure and idempotent.
pub fn normalize(doc: &Value) -> WrappedPipeline {
    match doc {
        Value::Object(map) if map.contains_key(PIPELINE_KEY) => {
            let mut extra = map.clone();
            let pipeline = extra.remove(PIPELINE_KEY).unwrap_or(Value::Null);
            let errors = extra.remove(ERRORS_KEY).unwrap_or_else(empty_sequence);
            let warnings = extra.remove(WARNINGS_KEY).unwrap_or_else(empty_sequence);
            WrappedPipeline {
                pipeline,
                errors,
                warnings,
                extra,
            }
        }
        other => WrappedPipeline::new(other.clone()),
    }
}

impl From<&Value> for WrappedPipeline {
    fn from(doc: &Value) -> Self {
        normalize(doc)
    }
}

impl From<Value> for WrappedPipeline {
    fn from(doc: Value) -> Self {
        normalize(&doc)
    }
}
