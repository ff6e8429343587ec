//! 类型模块：响应信封、任务句柄与流水线提交格式。
//!
//! # Types Module
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ResultEnvelope`] | `{status, data, error, metrics}` wrapper around every JSON response |
//! | [`TaskInfo`] | `{token, type}` handle returned by task submission |
//! | [`TaskStatus`] | Status payload of a running task |
//! | [`WrappedPipeline`] | Canonical `{pipeline, errors, warnings}` submission body |

pub mod envelope;
pub mod pipeline;

pub use envelope::{ResultEnvelope, ResultStatus, TaskInfo, TaskStatus};
pub use pipeline::{normalize, WrappedPipeline};
