//! Webhook uploads: raw single file, multipart batch, legacy base64 records.

use crate::mock_server::MockServerFixture;
use aparavi_dtc_sdk::{Error, ErrorKind, UploadEncoding};
use mockito::Matcher;
use serde_json::json;
use tempfile::TempDir;

fn webhook_query(token: &str, task_type: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("token".into(), token.into()),
        Matcher::UrlEncoded("type".into(), task_type.into()),
    ])
}

/// `a.txt` ("alpha"), `b.txt` ("beta") and a hidden `.skip.txt`.
fn input_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    std::fs::write(dir.path().join("b.txt"), "beta").unwrap();
    std::fs::write(dir.path().join(".skip.txt"), "hidden").unwrap();
    dir
}

fn pattern(dir: &TempDir, glob: &str) -> String {
    format!("{}/{}", dir.path().display(), glob)
}

#[test]
fn test_single_file_is_sent_as_raw_body() {
    let dir = input_dir();
    let mut fixture = MockServerFixture::new();
    let m = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(webhook_query("tok-1", "gpu"))
        .match_header("content-type", "text/plain")
        .match_header("content-disposition", r#"attachment; filename="a.txt""#)
        .match_body("alpha")
        .with_status(200)
        .with_body(r#"{"status":"OK","data":{"objects":1}}"#)
        .expect(1)
        .create();
    let client = fixture.client();

    let responses = client
        .send_to_webhook_with_file("tok-1", "gpu", &pattern(&dir, "a.*"))
        .unwrap();
    assert_eq!(
        responses,
        vec![json!({"status": "OK", "data": {"objects": 1}})]
    );
    m.assert();
}

#[test]
fn test_several_files_go_in_one_multipart_request() {
    let dir = input_dir();
    let mut fixture = MockServerFixture::new();
    let m = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(webhook_query("tok-1", "cpu"))
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=.+$".into()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="files"; filename="a.txt""#.into()),
            Matcher::Regex(r#"name="files"; filename="b.txt""#.into()),
            Matcher::Regex("alpha".into()),
            Matcher::Regex("beta".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"status":"OK"}"#)
        .expect(1)
        .create();
    let client = fixture.client();

    let responses = client
        .upload_files("tok-1", "cpu", &pattern(&dir, "*.txt"), UploadEncoding::Raw)
        .unwrap();
    assert_eq!(responses.len(), 1);
    m.assert();
}

#[test]
fn test_hidden_files_are_not_uploaded() {
    let dir = input_dir();
    let mut fixture = MockServerFixture::new();
    let m = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("hidden".into()))
        .expect(0)
        .create();
    let _ok = fixture.mock_json("PUT", "/webhook", 200, &json!({"status": "OK"}));
    let client = fixture.client();

    client
        .upload_files("tok-1", "gpu", &pattern(&dir, "*.txt"), UploadEncoding::Raw)
        .unwrap();
    m.assert();
}

#[test]
fn test_legacy_base64_sends_one_record_per_file() {
    let dir = input_dir();
    let mut fixture = MockServerFixture::new();
    let alpha = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(webhook_query("tok-1", "gpu"))
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "record": {"filename": "a.txt", "content": "YWxwaGE=", "encoding": "base64"}
        })))
        .with_status(200)
        .with_body(r#"{"status":"OK","data":"a"}"#)
        .expect(1)
        .create();
    let beta = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(webhook_query("tok-1", "gpu"))
        .match_body(Matcher::PartialJson(json!({
            "record": {"filename": "b.txt", "content": "YmV0YQ==", "encoding": "base64"}
        })))
        .with_status(200)
        .with_body(r#"{"status":"OK","data":"b"}"#)
        .expect(1)
        .create();
    let client = fixture.client();

    let responses = client
        .upload_files(
            "tok-1",
            "gpu",
            &pattern(&dir, "*.txt"),
            UploadEncoding::Base64Json,
        )
        .unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["data"], "a");
    assert_eq!(responses[1]["data"], "b");
    alpha.assert();
    beta.assert();
}

#[test]
fn test_no_matches_fails_before_any_request() {
    let dir = input_dir();
    let mut fixture = MockServerFixture::new();
    let m = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(Matcher::Any)
        .expect(0)
        .create();
    let client = fixture.client();

    let err = client
        .send_to_webhook_with_file("tok-1", "gpu", &pattern(&dir, "*.pdf"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(err.to_string().contains("No files matched pattern"));
    m.assert();
}

#[test]
fn test_failed_record_aborts_remaining_uploads() {
    let dir = input_dir();
    let mut fixture = MockServerFixture::new();
    let _alpha = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({"record": {"filename": "a.txt"}})))
        .with_status(500)
        .with_body("pipeline crashed")
        .create();
    let beta = fixture
        .server
        .mock("PUT", "/webhook")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({"record": {"filename": "b.txt"}})))
        .expect(0)
        .create();
    let client = fixture.client();

    let err = client
        .upload_files(
            "tok-1",
            "gpu",
            &pattern(&dir, "*.txt"),
            UploadEncoding::Base64Json,
        )
        .unwrap_err();
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "pipeline crashed");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    beta.assert();
}

#[test]
fn test_upload_keeps_authentication_and_validation_kinds() {
    let dir = input_dir();
    let mut fixture = MockServerFixture::new();
    let _m = fixture.mock_error_response("PUT", "/webhook", 401, "expired");
    let client = fixture.client();

    let err = client
        .send_to_webhook_with_file("tok-1", "gpu", &pattern(&dir, "a.txt"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);

    let mut fixture = MockServerFixture::new();
    let _m = fixture.mock_error_response("PUT", "/webhook", 422, "token missing");
    let client = fixture.client();

    let err = client
        .send_to_webhook_with_file("tok-1", "gpu", &pattern(&dir, "a.txt"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
