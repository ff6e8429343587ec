use thiserror::Error;

/// Structured error context for local (pre-network) failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Argument or configuration key that caused the error (e.g., "threads", "file_glob")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, offending value)
    pub details: Option<String>,
    /// Source of the error (e.g., "client_builder", "webhook_upload")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse error taxonomy callers can branch on.
///
/// Several [`Error`] variants collapse into one kind: network failures, malformed
/// responses and unexpected HTTP statuses are all [`ErrorKind::Service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 401 from any endpoint.
    Authentication,
    /// HTTP 422 from any endpoint.
    Validation,
    /// The service reported that the referenced task does not exist.
    TaskNotFound,
    /// `/pipe/validate` answered with an `Error` envelope.
    Pipeline,
    /// `PUT /task` answered with an `Error` envelope.
    TaskStart,
    /// Any other remote, transport or response-format failure.
    Service,
    /// Local precondition violation; no request was issued.
    Input,
}

/// Unified error type for the DTC client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid API key or authentication failed")]
    Authentication,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Task not found: {message}")]
    TaskNotFound { message: String },

    #[error("Pipeline validation failed: {message}")]
    Pipeline { message: String },

    #[error("Task execution failed: {message}")]
    TaskStart { message: String },

    #[error("API error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("{message}")]
    Service { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid input: {message}{}", format_context(.context))]
    Input {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn input(msg: impl Into<String>) -> Self {
        Error::Input {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn input_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Input {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Error::Service {
            message: msg.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Error::InvalidResponse {
            message: msg.into(),
        }
    }

    /// Fold this error into the coarse [`ErrorKind`] taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authentication => ErrorKind::Authentication,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::TaskNotFound { .. } => ErrorKind::TaskNotFound,
            Error::Pipeline { .. } => ErrorKind::Pipeline,
            Error::TaskStart { .. } => ErrorKind::TaskStart,
            Error::Input { .. } | Error::Configuration { .. } | Error::Io(_) => ErrorKind::Input,
            Error::Remote { .. }
            | Error::Service { .. }
            | Error::InvalidResponse { .. }
            | Error::Transport(_)
            | Error::Serialization(_) => ErrorKind::Service,
        }
    }

    /// Upstream HTTP status, when the failure came from a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication => Some(401),
            Error::Validation { .. } => Some(422),
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Input { context, .. } | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
