//! 流水线执行工作流：校验 → 提交 → （轮询 → 上传）→ 最终状态 → 清理。
//!
//! Pipeline execution workflow.
//!
//! [`DtcClient::execute_pipeline_workflow`] drives one task through
//! `Validating → Submitting → (WebhookPolling → Uploading →) AwaitingFinalStatus →
//! TearingDown → Done`. It never returns an error: every failure is logged and reported
//! as [`WorkflowOutcome::Failed`] with the stage it happened in and a
//! [`FailureKind`]. Once a task exists it is always torn down, and teardown failures are
//! only logged.

use crate::client::core::{DtcClient, TaskOptions};
use crate::client::upload::UploadEncoding;
use crate::types::{normalize, TaskInfo, TaskStatus};
use crate::{Error, ErrorKind};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_POLL_ATTEMPTS: u32 = 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// How long to wait for a webhook task to report `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Blocking sleep between two status checks.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Caller inputs for one workflow run.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRequest {
    pub task: TaskOptions,
    /// Files to push to a webhook pipeline. Required when the pipeline's source is a webhook.
    pub file_glob: Option<String>,
    pub poll: PollPolicy,
    pub encoding: UploadEncoding,
}

impl WorkflowRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.task = self.task.name(name);
        self
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task = self.task.task_type(task_type);
        self
    }

    pub fn threads(mut self, threads: u32) -> Self {
        self.task = self.task.threads(threads);
        self
    }

    pub fn file_glob(mut self, pattern: impl Into<String>) -> Self {
        self.file_glob = Some(pattern.into());
        self
    }

    pub fn poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn encoding(mut self, encoding: UploadEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowStage {
    Validating,
    Submitting,
    WebhookPolling,
    Uploading,
    AwaitingFinalStatus,
    TearingDown,
    Done,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowStage::Validating => "validating",
            WorkflowStage::Submitting => "submitting",
            WorkflowStage::WebhookPolling => "webhook_polling",
            WorkflowStage::Uploading => "uploading",
            WorkflowStage::AwaitingFinalStatus => "awaiting_final_status",
            WorkflowStage::TearingDown => "tearing_down",
            WorkflowStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a workflow produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The service (or the network) rejected a step.
    Remote,
    /// A local precondition failed; the offending step issued no request.
    Precondition,
    /// The task never reached `Running` within the polling budget.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowFailure {
    pub stage: WorkflowStage,
    pub kind: FailureKind,
    /// Taxonomy of the underlying client error, when there was one.
    pub error_kind: Option<ErrorKind>,
    pub message: String,
}

impl WorkflowFailure {
    fn from_error(stage: WorkflowStage, err: &Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::Input => FailureKind::Precondition,
            _ => FailureKind::Remote,
        };
        Self {
            stage,
            kind,
            error_kind: Some(err.kind()),
            message: err.to_string(),
        }
    }

    fn new(stage: WorkflowStage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            error_kind: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for WorkflowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { stage, message, .. } = self;
        write!(f, "workflow failed while {stage}: {message}")
    }
}

/// Result of a successful workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutput {
    /// Webhook pipeline: the upload responses.
    Uploaded(Vec<Value>),
    /// Any other pipeline: the final task status data.
    Finished(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Completed(WorkflowOutput),
    Failed(WorkflowFailure),
}

impl WorkflowOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed(_))
    }

    pub fn output(&self) -> Option<&WorkflowOutput> {
        match self {
            WorkflowOutcome::Completed(output) => Some(output),
            WorkflowOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&WorkflowFailure> {
        match self {
            WorkflowOutcome::Completed(_) => None,
            WorkflowOutcome::Failed(failure) => Some(failure),
        }
    }

    /// Drop the failure details, leaving only "result or nothing".
    pub fn into_output(self) -> Option<WorkflowOutput> {
        match self {
            WorkflowOutcome::Completed(output) => Some(output),
            WorkflowOutcome::Failed(_) => None,
        }
    }
}

type StepResult<T> = std::result::Result<T, WorkflowFailure>;

impl DtcClient {
    /// Validate, submit and drive a pipeline to completion, feeding it files when its
    /// source is a webhook.
    pub fn execute_pipeline_workflow(
        &self,
        pipeline: &Value,
        request: &WorkflowRequest,
    ) -> WorkflowOutcome {
        let outcome = match self.run_workflow(pipeline, request) {
            Ok(output) => WorkflowOutcome::Completed(output),
            Err(failure) => WorkflowOutcome::Failed(failure),
        };
        match &outcome {
            WorkflowOutcome::Completed(_) => {
                info!(stage = %WorkflowStage::Done, "workflow completed")
            }
            WorkflowOutcome::Failed(failure) => error!(
                stage = %failure.stage,
                kind = ?failure.kind,
                "workflow failed: {}",
                failure.message
            ),
        }
        outcome
    }

    fn run_workflow(
        &self,
        pipeline: &Value,
        request: &WorkflowRequest,
    ) -> StepResult<WorkflowOutput> {
        let wrapped = normalize(pipeline);
        let document = wrapped.to_value();

        info!(stage = %WorkflowStage::Validating, "validating pipeline");
        self.validate_pipe(&document)
            .map_err(|e| WorkflowFailure::from_error(WorkflowStage::Validating, &e))?;

        info!(stage = %WorkflowStage::Submitting, "submitting task");
        let task = self
            .start_task(&document, &request.task)
            .map_err(|e| WorkflowFailure::from_error(WorkflowStage::Submitting, &e))?
            .data
            .ok_or_else(|| {
                WorkflowFailure::new(
                    WorkflowStage::Submitting,
                    FailureKind::Remote,
                    "task submission returned no data",
                )
            })?;

        let result = if wrapped.is_webhook() {
            self.feed_webhook(&task, request)
        } else {
            self.final_status(&task)
        };

        self.teardown(&task);
        result
    }

    fn feed_webhook(
        &self,
        task: &TaskInfo,
        request: &WorkflowRequest,
    ) -> StepResult<WorkflowOutput> {
        let file_glob = request.file_glob.as_deref().ok_or_else(|| {
            WorkflowFailure::new(
                WorkflowStage::Uploading,
                FailureKind::Precondition,
                "file_glob is required for webhook pipelines",
            )
        })?;

        self.wait_until_running(task, &request.poll)?;

        info!(stage = %WorkflowStage::Uploading, file_glob, "uploading files");
        let responses = self
            .upload_files(&task.token, &task.task_type, file_glob, request.encoding)
            .map_err(|e| WorkflowFailure::from_error(WorkflowStage::Uploading, &e))?;

        info!(stage = %WorkflowStage::AwaitingFinalStatus, "fetching final status");
        match self.get_task_status_raw(&task.token, &task.task_type) {
            Ok(status) => debug!(status = ?status.data, "final task status"),
            Err(e) => warn!(error = %e, "could not fetch final status after upload"),
        }

        Ok(WorkflowOutput::Uploaded(responses))
    }

    fn wait_until_running(&self, task: &TaskInfo, poll: &PollPolicy) -> StepResult<()> {
        info!(
            stage = %WorkflowStage::WebhookPolling,
            max_attempts = poll.max_attempts,
            "waiting for task to start running"
        );
        for attempt in 1..=poll.max_attempts {
            let status = self
                .get_task_status_raw(&task.token, &task.task_type)
                .map_err(|e| WorkflowFailure::from_error(WorkflowStage::WebhookPolling, &e))?;
            let running = status
                .data
                .as_ref()
                .map(TaskStatus::payload_is_running)
                .unwrap_or(false);
            if running {
                info!(attempt, "task is running");
                return Ok(());
            }
            debug!(attempt, status = ?status.data, "task not running yet");
            if attempt < poll.max_attempts {
                std::thread::sleep(poll.interval);
            }
        }
        Err(WorkflowFailure::new(
            WorkflowStage::WebhookPolling,
            FailureKind::Timeout,
            format!(
                "task did not reach Running within {} attempts",
                poll.max_attempts
            ),
        ))
    }

    fn final_status(&self, task: &TaskInfo) -> StepResult<WorkflowOutput> {
        info!(stage = %WorkflowStage::AwaitingFinalStatus, "fetching final status");
        let status = self
            .get_task_status_raw(&task.token, &task.task_type)
            .map_err(|e| WorkflowFailure::from_error(WorkflowStage::AwaitingFinalStatus, &e))?;
        let data = status.data.ok_or_else(|| {
            WorkflowFailure::new(
                WorkflowStage::AwaitingFinalStatus,
                FailureKind::Remote,
                "status response carried no data",
            )
        })?;
        Ok(WorkflowOutput::Finished(data))
    }

    fn teardown(&self, task: &TaskInfo) {
        info!(stage = %WorkflowStage::TearingDown, token = %task.token, "ending task");
        if let Err(e) = self.end_task(&task.token, &task.task_type) {
            warn!(error = %e, token = %task.token, "task teardown failed");
        }
    }
}
