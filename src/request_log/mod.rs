//! LLM 请求/响应日志模块
//!
//! 提供请求关联、响应内容归一化和 JSON 日志文件持久化

pub mod model;
pub mod normalizer;
pub mod store;
pub mod tracker;

mod logger;

pub use logger::{LoggingSession, RequestLogger, global_logger, init_global_logger};
pub use model::{
    Choice, ChoiceMessage, LogRecord, PendingRequest, RequestPayload, RequestRecord,
    ResponseRecord, ToolCall, ToolCallFunction, Usage,
};
pub use store::RequestLogConfig;
