//! Webhook file upload.
//!
//! Files go to `PUT /webhook?token=..&type=..` of a running webhook task. One matched
//! file is sent as the raw request body, several are sent together as one multipart
//! request. The older base64-in-JSON shape is still available as
//! [`UploadEncoding::Base64Json`].

use crate::client::core::DtcClient;
use crate::utils::{glob, mime};
use crate::{Error, ErrorContext, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Method;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

const WEBHOOK_PATH: &str = "/webhook";

/// Multipart field name carrying each uploaded file.
const MULTIPART_FIELD: &str = "files";

/// Wire shape used to push files to a webhook task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadEncoding {
    /// Raw bytes for a single file, multipart for several. One request either way.
    #[default]
    Raw,
    /// Legacy: one JSON request per file, `{record: {filename, content, encoding: "base64"}}`.
    Base64Json,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn content_disposition(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{}\"", escaped)
}

impl DtcClient {
    /// Upload every file matching `file_glob` to a running webhook task.
    ///
    /// Shorthand for [`DtcClient::upload_files`] with [`UploadEncoding::Raw`].
    pub fn send_to_webhook_with_file(
        &self,
        token: &str,
        task_type: &str,
        file_glob: &str,
    ) -> Result<Vec<Value>> {
        self.upload_files(token, task_type, file_glob, UploadEncoding::Raw)
    }

    /// Upload every file matching `file_glob` using the given encoding.
    ///
    /// Returns one response per request issued: a single entry for raw and multipart
    /// uploads, one per file for the legacy encoding. A glob without matches fails before
    /// any request; any non-2xx response aborts the whole call.
    pub fn upload_files(
        &self,
        token: &str,
        task_type: &str,
        file_glob: &str,
        encoding: UploadEncoding,
    ) -> Result<Vec<Value>> {
        let paths = glob::resolve(file_glob);
        if paths.is_empty() {
            return Err(Error::input_with_context(
                format!("No files matched pattern: {}", file_glob),
                ErrorContext::new()
                    .with_field_path("file_glob")
                    .with_source("webhook_upload"),
            ));
        }
        info!(files = paths.len(), encoding = ?encoding, "uploading files to webhook");

        let query = [
            ("token", token.to_string()),
            ("type", task_type.to_string()),
        ];
        match (encoding, paths.as_slice()) {
            (UploadEncoding::Raw, [single]) => Ok(vec![self.upload_raw(&query, single)?]),
            (UploadEncoding::Raw, many) => Ok(vec![self.upload_multipart(&query, many)?]),
            (UploadEncoding::Base64Json, many) => many
                .iter()
                .map(|path| self.upload_base64(&query, path))
                .collect(),
        }
    }

    fn upload_raw(&self, query: &[(&str, String)], path: &Path) -> Result<Value> {
        let bytes = std::fs::read(path)?;
        let name = file_name(path);
        self.transport.send_bytes(
            Method::PUT,
            WEBHOOK_PATH,
            query,
            bytes,
            mime::guess_content_type(path),
            &[(CONTENT_DISPOSITION, content_disposition(&name))],
        )
    }

    fn upload_multipart(&self, query: &[(&str, String)], paths: &[PathBuf]) -> Result<Value> {
        let mut form = Form::new();
        for path in paths {
            let part = Part::bytes(std::fs::read(path)?)
                .file_name(file_name(path))
                .mime_str(mime::guess_content_type(path))
                .map_err(|e| Error::Transport(crate::transport::TransportError::Http(e)))?;
            form = form.part(MULTIPART_FIELD, part);
        }
        self.transport
            .send_multipart(Method::PUT, WEBHOOK_PATH, query, form)
    }

    fn upload_base64(&self, query: &[(&str, String)], path: &Path) -> Result<Value> {
        let encoded = BASE64.encode(std::fs::read(path)?);
        let body = json!({
            "record": {
                "filename": file_name(path),
                "content": encoded,
                "encoding": "base64"
            }
        });
        self.transport
            .request(Method::PUT, WEBHOOK_PATH, query, Some(&body))
    }
}
