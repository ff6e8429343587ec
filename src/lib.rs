//! # aparavi-dtc-sdk
//!
//! Aparavi Data Toolchain（DTC）Web 服务的 Rust 客户端：校验流水线、提交任务、轮询状态、
//! 向 Webhook 任务推送文件并清理任务。
//!
//! Client SDK for the Aparavi Data Toolchain web services.
//!
//! ## Overview
//!
//! The service runs pipelines as asynchronous tasks. This crate wraps its REST
//! endpoints with typed, blocking calls and layers one client-side workflow on top:
//! submit a pipeline, wait for it to run, feed it files when it is webhook-driven,
//! collect the final status and tear the task down.
//!
//! - **Lifecycle operations**: [`DtcClient::validate_pipe`], [`DtcClient::start_task`],
//!   [`DtcClient::get_task_status`], [`DtcClient::end_task`], [`DtcClient::get_version`]
//! - **Webhook uploads**: [`DtcClient::upload_files`] (raw / multipart, legacy base64)
//! - **Workflow**: [`DtcClient::execute_pipeline_workflow`] returning a [`WorkflowOutcome`]
//! - **Predefined pipelines**: [`pipelines::PredefinedPipeline`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aparavi_dtc_sdk::pipelines::PredefinedPipeline;
//! use aparavi_dtc_sdk::{DtcClient, WorkflowOutcome, WorkflowRequest};
//!
//! fn main() -> aparavi_dtc_sdk::Result<()> {
//!     let client = DtcClient::builder()
//!         .base_url("https://dtc.example.com")
//!         .api_key("your-api-key")
//!         .build()?;
//!
//!     let pipeline = PredefinedPipeline::SimpleParser.load()?;
//!     let request = WorkflowRequest::new().name("docs").file_glob("./inbox/*.pdf");
//!
//!     match client.execute_pipeline_workflow(&pipeline, &request) {
//!         WorkflowOutcome::Completed(output) => println!("{:?}", output),
//!         WorkflowOutcome::Failed(failure) => eprintln!("{}", failure),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, configuration, lifecycle operations, uploads, workflow |
//! | [`transport`] | Blocking HTTP session and status classification |
//! | [`types`] | Result envelope, task payloads, pipeline normalization |
//! | [`pipelines`] | Bundled pipeline definitions and pipeline-file loading |
//! | [`utils`] | Glob resolution and content-type guessing |

pub mod client;
pub mod pipelines;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::{
    ClientConfig, DtcClient, DtcClientBuilder, FailureKind, PollPolicy, TaskOptions,
    UploadEncoding, WorkflowFailure, WorkflowOutcome, WorkflowOutput, WorkflowRequest,
    WorkflowStage,
};
pub use types::{normalize, ResultEnvelope, ResultStatus, TaskInfo, TaskStatus, WrappedPipeline};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
