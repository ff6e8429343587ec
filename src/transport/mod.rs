//! 传输层：带 Bearer 认证、固定超时和状态码分类的阻塞式 HTTP 调用。
//!
//! HTTP transport for the DTC web services.

pub mod http;

pub use http::{HttpTransport, TransportError};
