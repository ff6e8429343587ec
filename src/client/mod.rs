//! 客户端模块：任务生命周期操作、Webhook 上传与工作流编排。
//!
//! Client for the DTC web services.

pub mod builder;
pub mod core;
pub(crate) mod error_classification;
pub mod upload;
pub mod workflow;

pub use builder::{ClientConfig, DtcClientBuilder, DEFAULT_TIMEOUT_SECS};
pub use self::core::{DtcClient, TaskOptions, DEFAULT_TASK_TYPE, THREADS_RANGE};
pub use upload::UploadEncoding;
pub use workflow::{
    FailureKind, PollPolicy, WorkflowFailure, WorkflowOutcome, WorkflowOutput, WorkflowRequest,
    WorkflowStage, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
