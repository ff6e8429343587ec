use crate::client::ClientConfig;
use crate::{Error, ErrorContext, Result};
use reqwest::blocking::{multipart::Form, Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

/// Upper bound on how much of a non-JSON body is echoed back in an invalid-response error.
const BODY_SNIPPET_LIMIT: usize = 512;

/// Blocking HTTP session shared by every operation of one client.
///
/// Holds the normalized base URL, the default headers (bearer token and JSON content
/// type) and the fixed timeout. Immutable once built.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    verbose: bool,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let bearer = format!("Bearer {}", config.api_key);
        let mut auth = HeaderValue::from_str(&bearer).map_err(|e| {
            Error::configuration_with_context(
                format!("API key is not a valid header value: {}", e),
                ErrorContext::new()
                    .with_field_path("api_key")
                    .with_source("http_transport"),
            )
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            verbose: config.verbose,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a JSON request and return the parsed JSON response body.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path);
        debug!(method = %method, url = %url, query = ?query, body = ?body, "dtc request");

        let mut request = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        self.execute(request, &method, &url)
    }

    /// Send a raw body with an explicit content type, replacing the JSON default.
    pub fn send_bytes(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Vec<u8>,
        content_type: &str,
        headers: &[(HeaderName, String)],
    ) -> Result<Value> {
        let url = self.url(path);
        debug!(
            method = %method,
            url = %url,
            query = ?query,
            content_type,
            bytes = body.len(),
            "dtc raw request"
        );

        let mut request = self
            .client
            .request(method.clone(), &url)
            .query(query)
            .header(CONTENT_TYPE, content_type);
        for (name, value) in headers {
            request = request.header(name.clone(), value.as_str());
        }

        self.execute(request.body(body), &method, &url)
    }

    /// Send a multipart form; the form supplies its own boundary content type.
    pub fn send_multipart(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        form: Form,
    ) -> Result<Value> {
        let url = self.url(path);
        debug!(method = %method, url = %url, query = ?query, "dtc multipart request");

        let request = self
            .client
            .request(method.clone(), &url)
            .query(query)
            .multipart(form);

        self.execute(request, &method, &url)
    }

    fn execute(&self, request: RequestBuilder, method: &Method, url: &str) -> Result<Value> {
        let response = request
            .send()
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "dtc response");

        let text = response
            .text()
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        if self.verbose {
            debug!(body = %text, "dtc response body");
        }

        classify_response(status, text)
    }
}

/// Map an HTTP status and body onto the client's error taxonomy, parsing JSON on success.
pub(crate) fn classify_response(status: StatusCode, body: String) -> Result<Value> {
    match status.as_u16() {
        401 => Err(Error::Authentication),
        422 => Err(Error::Validation { message: body }),
        code if code >= 400 => Err(Error::Remote {
            status: code,
            message: body,
        }),
        _ => serde_json::from_str(&body).map_err(|e| {
            let snippet: String = body.chars().take(BODY_SNIPPET_LIMIT).collect();
            Error::invalid_response(format!("expected a JSON body ({}): {}", e, snippet))
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
