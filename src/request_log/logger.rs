//! 日志门面
//!
//! 组合 ID 生成、在途追踪、响应归一化和文件持久化，对外提供
//! 两段式接口：`start_logging` 返回绑定请求 ID 的会话句柄，
//! 句柄的 `complete` 产生恰好一条持久化记录。
//!
//! 所有错误在此吞掉并记录，日志失败绝不影响宿主的请求流程

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use serde_json::Value;

use crate::common;

use super::model::{LogRecord, PendingRequest, RequestPayload, RequestRecord};
use super::normalizer;
use super::store::{LogFileStore, RequestLogConfig};
use super::tracker::PendingTracker;

/// 请求日志记录器
#[derive(Debug, Clone)]
pub struct RequestLogger {
    tracker: Arc<PendingTracker>,
    store: Arc<LogFileStore>,
}

impl RequestLogger {
    pub fn new(config: RequestLogConfig) -> Self {
        Self {
            tracker: Arc::new(PendingTracker::new()),
            store: Arc::new(LogFileStore::new(config)),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(RequestLogConfig::default())
    }

    /// 日志文件路径
    pub fn log_file_path(&self) -> &Path {
        self.store.path()
    }

    /// 当前在途会话数
    pub fn pending_count(&self) -> usize {
        self.tracker.len()
    }

    /// 开始一次日志会话
    ///
    /// 生成请求 ID、登记在途条目，返回绑定该 ID 的完成句柄。
    /// 句柄捕获 url/model/payload 作为回退值，即使在途条目已被
    /// 消费（或从未登记）也能正确完成
    pub fn start_logging(
        &self,
        url: impl Into<String>,
        model: impl Into<String>,
        payload: Value,
    ) -> LoggingSession {
        let url = url.into();
        let model = model.into();
        let id = common::new_request_id();

        self.tracker.put(
            id.clone(),
            PendingRequest {
                url: url.clone(),
                model: model.clone(),
                request_data: payload.clone(),
                started_at: Instant::now(),
            },
        );

        tracing::debug!(request_id = %id, model = %model, "开始日志会话");

        LoggingSession {
            id,
            url,
            model,
            request_data: payload,
            logger: self.clone(),
        }
    }

    /// 完成一次会话：取出在途条目（缺失时使用回退值），归一化响应，
    /// 追加恰好一条日志记录
    async fn complete_with_fallback(
        &self,
        id: &str,
        fallback_url: &str,
        fallback_model: &str,
        fallback_payload: &Value,
        response_payload: Value,
        latency_ms: u64,
        tool_responses: Option<Value>,
    ) {
        let (url, model, request_data) = match self.tracker.take(id) {
            Some(pending) => {
                tracing::debug!(
                    request_id = %id,
                    elapsed_ms = pending.started_at.elapsed().as_millis() as u64,
                    "完成日志会话"
                );
                (pending.url, pending.model, pending.request_data)
            }
            None => {
                tracing::debug!(request_id = %id, "在途条目缺失，使用调用方提供的回退值");
                (
                    fallback_url.to_string(),
                    fallback_model.to_string(),
                    fallback_payload.clone(),
                )
            }
        };

        let payload = RequestPayload::from_value(&request_data);
        let stream = payload.is_stream() || response_payload.get("streamChunks").is_some();
        let has_function_call = payload.has_tools();

        let mut response = normalizer::normalize_response(&response_payload, latency_ms);
        response.tool_responses = tool_responses;

        let record = LogRecord {
            timestamp: common::format_timestamp(),
            request: RequestRecord {
                id: id.to_string(),
                url,
                model,
                stream,
                has_function_call,
                payload,
            },
            response,
        };

        if let Err(e) = self.store.append(record).await {
            tracing::error!(request_id = %id, error = %e, "写入请求日志失败");
        }
    }

    /// 兼容旧接口：记录请求，仅返回请求 ID
    ///
    /// 在途条目正常登记，后续通过 [`RequestLogger::log_response`] 完成
    #[deprecated(note = "请使用 start_logging / LoggingSession::complete")]
    pub fn log_request(&self, url: &str, model: &str, payload: Value) -> String {
        self.start_logging(url, model, payload).id().to_string()
    }

    /// 兼容旧接口：按 ID 记录响应
    ///
    /// ID 未知时（已完成或从未登记）回退为空 url/model 和 null payload
    #[deprecated(note = "请使用 LoggingSession::complete")]
    pub async fn log_response(&self, id: &str, response_payload: Value, latency_ms: u64) {
        self.complete_with_fallback(id, "", "", &Value::Null, response_payload, latency_ms, None)
            .await;
    }
}

/// 日志会话：持有请求 ID 和完成所需的回退值
#[derive(Debug, Clone)]
pub struct LoggingSession {
    id: String,
    url: String,
    model: String,
    request_data: Value,
    logger: RequestLogger,
}

impl LoggingSession {
    /// 本会话的请求 ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 完成会话，归一化响应并追加一条日志记录
    ///
    /// 调用方约定每个会话恰好调用一次。每次调用都产生一条记录；
    /// 在途条目只被第一次调用消费，后续调用使用会话捕获的回退值
    pub async fn complete(
        &self,
        response_payload: Value,
        latency_ms: u64,
        tool_responses: Option<Value>,
    ) {
        self.logger
            .complete_with_fallback(
                &self.id,
                &self.url,
                &self.model,
                &self.request_data,
                response_payload,
                latency_ms,
                tool_responses,
            )
            .await;
    }
}

/// 全局日志记录器实例
static GLOBAL_LOGGER: OnceLock<RequestLogger> = OnceLock::new();

/// 初始化全局日志记录器（只生效一次）
pub fn init_global_logger(config: RequestLogConfig) {
    let _ = GLOBAL_LOGGER.set(RequestLogger::new(config));
}

/// 获取全局日志记录器，未初始化时使用默认配置创建
pub fn global_logger() -> &'static RequestLogger {
    GLOBAL_LOGGER.get_or_init(RequestLogger::with_defaults)
}
