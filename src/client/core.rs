use crate::client::builder::{ClientConfig, DtcClientBuilder};
use crate::client::error_classification::task_lookup_error;
use crate::transport::HttpTransport;
use crate::types::{normalize, ResultEnvelope, TaskInfo, TaskStatus};
use crate::{Error, ErrorContext, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

/// Task type sent when the caller does not choose one.
pub const DEFAULT_TASK_TYPE: &str = "gpu";

/// Accepted range for the `threads` submission parameter.
pub const THREADS_RANGE: std::ops::RangeInclusive<u32> = 1..=16;

/// Client for the DTC web services.
///
/// Stateless apart from its immutable session: task handles returned by
/// [`DtcClient::start_task`] are owned by the caller and passed back explicitly.
#[derive(Debug, Clone)]
pub struct DtcClient {
    pub(crate) transport: HttpTransport,
}

/// Query options for task submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub task_type: String,
    pub name: Option<String>,
    pub threads: Option<u32>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            task_type: DEFAULT_TASK_TYPE.to_string(),
            name: None,
            threads: None,
        }
    }
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Build the submission query, rejecting an out-of-range thread count.
    fn query(&self) -> Result<Vec<(&'static str, String)>> {
        let mut params = vec![("type", self.task_type.clone())];
        if let Some(name) = self.name.as_ref().filter(|n| !n.is_empty()) {
            params.push(("name", name.clone()));
        }
        if let Some(threads) = self.threads {
            if !THREADS_RANGE.contains(&threads) {
                return Err(Error::input_with_context(
                    "Threads must be between 1 and 16",
                    ErrorContext::new()
                        .with_field_path("threads")
                        .with_details(format!("got {}", threads))
                        .with_source("start_task"),
                ));
            }
            params.push(("threads", threads.to_string()));
        }
        Ok(params)
    }
}

fn task_query(token: &str, task_type: &str) -> [(&'static str, String); 2] {
    [
        ("token", token.to_string()),
        ("type", task_type.to_string()),
    ]
}

impl DtcClient {
    /// Create a client with the default timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        DtcClientBuilder::new()
            .base_url(base_url)
            .api_key(api_key)
            .build()
    }

    pub fn builder() -> DtcClientBuilder {
        DtcClientBuilder::new()
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<ResultEnvelope> {
        let response = self.transport.request(method, path, query, body)?;
        ResultEnvelope::from_value(response)
    }

    /// Get the version of the web services.
    pub fn get_version(&self) -> Result<ResultEnvelope> {
        let result = self.call(Method::GET, "/version", &[], None)?;
        if !result.is_ok() {
            return Err(Error::service(format!(
                "Failed to get version: {}",
                result.error_message()
            )));
        }
        Ok(result)
    }

    /// Validate a pipeline configuration without running it.
    ///
    /// The document is normalized first, so bare graphs are accepted.
    pub fn validate_pipe(&self, pipeline: &Value) -> Result<ResultEnvelope> {
        let body = normalize(pipeline).to_value();
        let result = self.call(Method::POST, "/pipe/validate", &[], Some(&body))?;
        if !result.is_ok() {
            return Err(Error::Pipeline {
                message: result.error_message(),
            });
        }
        debug!("pipeline validated");
        Ok(result)
    }

    /// Submit a pipeline as a new task.
    ///
    /// An out-of-range `threads` value is rejected before any request is made.
    pub fn start_task(
        &self,
        pipeline: &Value,
        options: &TaskOptions,
    ) -> Result<ResultEnvelope<TaskInfo>> {
        let query = options.query()?;
        let body = normalize(pipeline).to_value();
        let result = self.call(Method::PUT, "/task", &query, Some(&body))?;
        if !result.is_ok() {
            return Err(Error::TaskStart {
                message: result.error_message(),
            });
        }
        let result = result.into_typed::<TaskInfo>()?;
        if let Some(task) = &result.data {
            info!(token = %task.token, task_type = %task.task_type, "task started");
        }
        Ok(result)
    }

    /// Fetch the status of a task.
    pub fn get_task_status(
        &self,
        token: &str,
        task_type: &str,
    ) -> Result<ResultEnvelope<TaskStatus>> {
        self.get_task_status_raw(token, task_type)?.into_typed()
    }

    /// Fetch the status of a task, leaving `data` exactly as the service sent it.
    pub fn get_task_status_raw(&self, token: &str, task_type: &str) -> Result<ResultEnvelope> {
        let result = self.call(Method::GET, "/task", &task_query(token, task_type), None)?;
        if !result.is_ok() {
            return Err(task_lookup_error("get task status", &result));
        }
        Ok(result)
    }

    /// Cancel or end a task, releasing its server-side resources.
    pub fn end_task(&self, token: &str, task_type: &str) -> Result<ResultEnvelope> {
        let result = self.call(Method::DELETE, "/task", &task_query(token, task_type), None)?;
        if !result.is_ok() {
            return Err(task_lookup_error("end task", &result));
        }
        info!(token, "task ended");
        Ok(result)
    }
}
