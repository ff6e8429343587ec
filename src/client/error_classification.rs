//! Translation of `Error` envelopes into typed client errors.

use crate::types::ResultEnvelope;
use crate::Error;

/// Whether a service error message reports a missing task.
pub(crate) fn is_not_found_message(message: &str) -> bool {
    message.to_lowercase().contains("not found")
}

/// Error for a failed task lookup (status or teardown).
///
/// The service has no dedicated code for unknown tokens, so the message text decides:
/// anything mentioning "not found" becomes [`Error::TaskNotFound`].
pub(crate) fn task_lookup_error<T>(action: &str, envelope: &ResultEnvelope<T>) -> Error {
    let message = envelope.error_message();
    if is_not_found_message(&message) {
        Error::TaskNotFound { message }
    } else {
        Error::service(format!("Failed to {}: {}", action, message))
    }
}
