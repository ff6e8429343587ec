//! End-to-end workflow runs against scripted server responses.

use crate::mock_server::MockServerFixture;
use aparavi_dtc_sdk::{
    ErrorKind, FailureKind, PollPolicy, WorkflowOutcome, WorkflowOutput, WorkflowRequest,
    WorkflowStage,
};
use mockito::Mock;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;

const TOKEN: &str = "tok-7";

fn webhook_pipeline() -> Value {
    json!({
        "source": "webhook_1",
        "components": [
            {"id": "webhook_1", "provider": "webhook"},
            {"id": "parse_1", "provider": "parse", "input": [{"lane": "tags", "from": "webhook_1"}]}
        ]
    })
}

fn filesystem_pipeline() -> Value {
    json!({"pipeline": {"source": "filesys_1", "components": [{"id": "filesys_1"}]}})
}

fn fast_poll(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        max_attempts,
        interval: Duration::ZERO,
    }
}

/// Validation and submission both succeed, handing out `TOKEN`.
fn mock_accepting_server(fixture: &mut MockServerFixture) -> [Mock; 2] {
    [
        fixture.mock_json("POST", "/pipe/validate", 200, &json!({"status": "OK"})),
        fixture.mock_json(
            "PUT",
            "/task",
            200,
            &json!({"status": "OK", "data": {"token": TOKEN, "type": "gpu"}}),
        ),
    ]
}

fn status_mock(fixture: &mut MockServerFixture, data: Value, hits: usize) -> Mock {
    fixture
        .server
        .mock("GET", "/task")
        .match_query(mockito::Matcher::UrlEncoded("token".into(), TOKEN.into()))
        .with_status(200)
        .with_body(json!({"status": "OK", "data": data}).to_string())
        .expect(hits)
        .create()
}

fn teardown_mock(fixture: &mut MockServerFixture, hits: usize) -> Mock {
    fixture
        .server
        .mock("DELETE", "/task")
        .match_query(mockito::Matcher::UrlEncoded("token".into(), TOKEN.into()))
        .with_status(200)
        .with_body(r#"{"status":"OK"}"#)
        .expect(hits)
        .create()
}

fn upload_mock(fixture: &mut MockServerFixture, hits: usize) -> Mock {
    fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(mockito::Matcher::UrlEncoded("token".into(), TOKEN.into()))
        .with_status(200)
        .with_body(r#"{"status":"OK","data":{"accepted":true}}"#)
        .expect(hits)
        .create()
}

fn one_file() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("report.pdf"), b"%PDF-1.4").unwrap();
    let glob = format!("{}/*.pdf", dir.path().display());
    (dir, glob)
}

#[test]
fn test_non_webhook_pipeline_returns_final_status() {
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let status = status_mock(&mut fixture, json!({"status": "Completed", "rows": 42}), 1);
    let teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let outcome = client.execute_pipeline_workflow(&filesystem_pipeline(), &WorkflowRequest::new());

    assert_eq!(
        outcome,
        WorkflowOutcome::Completed(WorkflowOutput::Finished(
            json!({"status": "Completed", "rows": 42})
        ))
    );
    status.assert();
    teardown.assert();
}

#[test]
fn test_webhook_pipeline_polls_until_running_then_uploads() {
    let (_dir, glob) = one_file();
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let starting = status_mock(&mut fixture, json!({"status": "Starting"}), 2);
    // third poll plus the final status check
    let running = status_mock(&mut fixture, json!({"status": "Running"}), 2);
    let upload = upload_mock(&mut fixture, 1);
    let teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let request = WorkflowRequest::new().file_glob(glob).poll(fast_poll(5));
    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &request);

    assert_eq!(
        outcome.into_output(),
        Some(WorkflowOutput::Uploaded(vec![
            json!({"status": "OK", "data": {"accepted": true}})
        ]))
    );
    starting.assert();
    running.assert();
    upload.assert();
    teardown.assert();
}

#[test]
fn test_webhook_pipeline_that_never_runs_times_out() {
    let (_dir, glob) = one_file();
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let status = status_mock(&mut fixture, json!({"status": "Queued"}), 3);
    let upload = upload_mock(&mut fixture, 0);
    let teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let request = WorkflowRequest::new().file_glob(glob).poll(fast_poll(3));
    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &request);

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.stage, WorkflowStage::WebhookPolling);
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.error_kind, None);
    status.assert();
    upload.assert();
    teardown.assert();
}

#[test]
fn test_status_without_status_field_keeps_polling() {
    let (_dir, glob) = one_file();
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let pending = status_mock(&mut fixture, json!({"progress": 0}), 1);
    let running = status_mock(&mut fixture, json!({"status": "Running"}), 2);
    let upload = upload_mock(&mut fixture, 1);
    let _teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let request = WorkflowRequest::new().file_glob(glob).poll(fast_poll(4));
    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &request);

    assert!(outcome.is_completed(), "{:?}", outcome);
    pending.assert();
    running.assert();
    upload.assert();
}

#[test]
fn test_validation_failure_stops_before_submission() {
    let mut fixture = MockServerFixture::new();
    let _validate = fixture.mock_json(
        "POST",
        "/pipe/validate",
        200,
        &json!({"status": "Error", "error": "unknown provider"}),
    );
    let submit = fixture
        .server
        .mock("PUT", "/task")
        .match_query(mockito::Matcher::Any)
        .expect(0)
        .create();
    let client = fixture.client();

    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &WorkflowRequest::new());

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.stage, WorkflowStage::Validating);
    assert_eq!(failure.kind, FailureKind::Remote);
    assert_eq!(failure.error_kind, Some(ErrorKind::Pipeline));
    assert!(failure.message.contains("unknown provider"));
    submit.assert();
}

#[test]
fn test_submission_failure_issues_no_task_calls() {
    let mut fixture = MockServerFixture::new();
    let _validate = fixture.mock_json("POST", "/pipe/validate", 200, &json!({"status": "OK"}));
    let _submit = fixture.mock_json(
        "PUT",
        "/task",
        200,
        &json!({"status": "Error", "error": "quota exceeded"}),
    );
    let status = status_mock(&mut fixture, json!({"status": "Running"}), 0);
    let teardown = teardown_mock(&mut fixture, 0);
    let client = fixture.client();

    let outcome = client.execute_pipeline_workflow(&filesystem_pipeline(), &WorkflowRequest::new());

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.stage, WorkflowStage::Submitting);
    assert_eq!(failure.error_kind, Some(ErrorKind::TaskStart));
    assert_eq!(
        failure.to_string(),
        "workflow failed while submitting: Task execution failed: quota exceeded"
    );
    status.assert();
    teardown.assert();
}

#[test]
fn test_submission_without_data_is_remote_failure() {
    let mut fixture = MockServerFixture::new();
    let _validate = fixture.mock_json("POST", "/pipe/validate", 200, &json!({"status": "OK"}));
    let _submit = fixture.mock_json("PUT", "/task", 200, &json!({"status": "OK"}));
    let teardown = teardown_mock(&mut fixture, 0);
    let client = fixture.client();

    let outcome = client.execute_pipeline_workflow(&filesystem_pipeline(), &WorkflowRequest::new());

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.stage, WorkflowStage::Submitting);
    assert_eq!(failure.kind, FailureKind::Remote);
    teardown.assert();
}

#[test]
fn test_webhook_without_glob_is_precondition_failure() {
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let status = status_mock(&mut fixture, json!({"status": "Running"}), 0);
    let teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let request = WorkflowRequest::new().poll(fast_poll(3));
    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &request);

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.stage, WorkflowStage::Uploading);
    assert_eq!(failure.kind, FailureKind::Precondition);
    status.assert();
    teardown.assert();
}

#[test]
fn test_glob_without_matches_is_precondition_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let _running = status_mock(&mut fixture, json!({"status": "Running"}), 1);
    let upload = upload_mock(&mut fixture, 0);
    let teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let request = WorkflowRequest::new()
        .file_glob(format!("{}/*.docx", dir.path().display()))
        .poll(fast_poll(3));
    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &request);

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.stage, WorkflowStage::Uploading);
    assert_eq!(failure.kind, FailureKind::Precondition);
    assert_eq!(failure.error_kind, Some(ErrorKind::Input));
    upload.assert();
    teardown.assert();
}

#[test]
fn test_teardown_failure_does_not_change_outcome() {
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let _status = status_mock(&mut fixture, json!({"status": "Completed"}), 1);
    let teardown = fixture
        .server
        .mock("DELETE", "/task")
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create();
    let client = fixture.client();

    let outcome = client.execute_pipeline_workflow(&filesystem_pipeline(), &WorkflowRequest::new());

    assert_eq!(
        outcome,
        WorkflowOutcome::Completed(WorkflowOutput::Finished(json!({"status": "Completed"})))
    );
    teardown.assert();
}

#[test]
fn test_auth_failure_while_polling_still_tears_down() {
    let (_dir, glob) = one_file();
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let _status = fixture.mock_error_response("GET", "/task", 401, "expired");
    let teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let request = WorkflowRequest::new().file_glob(glob).poll(fast_poll(3));
    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &request);

    let failure = outcome.failure().unwrap();
    assert_eq!(failure.stage, WorkflowStage::WebhookPolling);
    assert_eq!(failure.kind, FailureKind::Remote);
    assert_eq!(failure.error_kind, Some(ErrorKind::Authentication));
    teardown.assert();
}

#[test]
fn test_structured_status_while_polling_counts_as_not_running() {
    let (_dir, glob) = one_file();
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let starting = status_mock(&mut fixture, json!({"status": {"phase": "starting"}}), 1);
    let running = status_mock(&mut fixture, json!({"status": "Running"}), 2);
    let upload = upload_mock(&mut fixture, 1);
    let _teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let request = WorkflowRequest::new().file_glob(glob).poll(fast_poll(4));
    let outcome = client.execute_pipeline_workflow(&webhook_pipeline(), &request);

    assert!(outcome.is_completed(), "{:?}", outcome);
    starting.assert();
    running.assert();
    upload.assert();
}

#[test]
fn test_final_status_data_is_returned_as_sent() {
    let mut fixture = MockServerFixture::new();
    let _accept = mock_accepting_server(&mut fixture);
    let status = status_mock(&mut fixture, json!("Complete"), 1);
    let teardown = teardown_mock(&mut fixture, 1);
    let client = fixture.client();

    let outcome = client.execute_pipeline_workflow(&filesystem_pipeline(), &WorkflowRequest::new());

    assert_eq!(
        outcome,
        WorkflowOutcome::Completed(WorkflowOutput::Finished(json!("Complete")))
    );
    status.assert();
    teardown.assert();
}
