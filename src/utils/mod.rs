//! 工具模块：本地文件匹配与内容类型推断。
//!
//! Helpers for the webhook upload path.

pub mod glob;
pub mod mime;
