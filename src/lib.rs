//! LLM 请求/响应日志子系统
//!
//! 面向 LLM API 代理的写路径审计日志：
//! - 请求/响应关联（按请求 ID 两段式记录）
//! - 异构上游响应格式归一化（候选格式 / OpenAI 兼容格式 / 流式最终响应）
//! - 共享 JSON 日志文件的增量持久化
//!
//! 日志是尽力而为的可观测性手段，任何内部错误都不会影响宿主请求流程

pub mod common;
pub mod request_log;

pub use request_log::{LoggingSession, RequestLogConfig, RequestLogger};
