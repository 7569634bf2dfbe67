//! 日志文件持久化
//!
//! 日志文件是单个 JSON 数组，供外部读者随时解析，因此每次追加
//! 执行完整的读-改-写循环而非字节级追加。整个循环持有同一把
//! 异步锁，并发追加串行化，避免丢失更新

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::sync::Mutex;

use super::model::LogRecord;

/// 请求日志配置
#[derive(Debug, Clone)]
pub struct RequestLogConfig {
    /// 日志文件路径
    pub log_path: PathBuf,
    /// 是否格式化输出 JSON
    pub pretty: bool,
    /// 是否启用持久化
    pub enabled: bool,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            log_path: std::env::temp_dir().join("llm_request_log.json"),
            pretty: true,
            enabled: true,
        }
    }
}

/// 日志文件存储
#[derive(Debug)]
pub struct LogFileStore {
    config: RequestLogConfig,
    /// 读-改-写临界区锁
    write_lock: Mutex<()>,
}

impl LogFileStore {
    pub fn new(config: RequestLogConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// 日志文件路径
    pub fn path(&self) -> &Path {
        &self.config.log_path
    }

    /// 追加一条记录
    ///
    /// 读取现有数组、追加、整体重写；缺失或损坏的文件按空日志处理，
    /// 保证后续写入始终可用
    pub async fn append(&self, record: LogRecord) -> anyhow::Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        let mut records = self.read_existing().await;
        records.push(serde_json::to_value(&record).context("序列化日志记录失败")?);

        let json = if self.config.pretty {
            serde_json::to_string_pretty(&records)
        } else {
            serde_json::to_string(&records)
        }
        .context("序列化日志数组失败")?;

        tokio::fs::write(&self.config.log_path, json)
            .await
            .with_context(|| {
                format!("写入日志文件失败: {}", self.config.log_path.display())
            })?;

        tracing::debug!(
            request_id = %record.request.id,
            total = records.len(),
            "日志记录已追加"
        );

        Ok(())
    }

    /// 读取当前全部记录
    ///
    /// 以 Value 数组读取，历史版本写入的记录即使无法反序列化为
    /// 当前结构也原样保留
    async fn read_existing(&self) -> Vec<serde_json::Value> {
        match tokio::fs::read_to_string(&self.config.log_path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        path = %self.config.log_path.display(),
                        error = %e,
                        "日志文件解析失败，按空日志处理"
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_log::model::{RequestPayload, RequestRecord, ResponseRecord};

    fn test_record(id: &str) -> LogRecord {
        LogRecord {
            timestamp: crate::common::format_timestamp(),
            request: RequestRecord {
                id: id.to_string(),
                url: "http://localhost:8000/v1/chat/completions".to_string(),
                model: "qwen3".to_string(),
                stream: false,
                has_function_call: false,
                payload: RequestPayload::default(),
            },
            response: ResponseRecord {
                status: 200,
                latency_ms: 1,
                usage: None,
                choices: Vec::new(),
                tool_responses: None,
                raw: None,
            },
        }
    }

    async fn read_records(path: &Path) -> Vec<serde_json::Value> {
        let content = tokio::fs::read_to_string(path).await.unwrap();
        serde_json::from_str(&content).unwrap()
    }

    /// 文件不存在时首次追加创建单元素数组
    #[tokio::test]
    async fn test_append_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogFileStore::new(RequestLogConfig {
            log_path: dir.path().join("log.json"),
            ..Default::default()
        });

        store.append(test_record("req_1")).await.unwrap();

        let records = read_records(store.path()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["request"]["id"], "req_1");
    }

    /// 追加保留先前写入的记录
    #[tokio::test]
    async fn test_append_preserves_prior_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogFileStore::new(RequestLogConfig {
            log_path: dir.path().join("log.json"),
            ..Default::default()
        });

        store.append(test_record("req_1")).await.unwrap();
        store.append(test_record("req_2")).await.unwrap();

        let records = read_records(store.path()).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["request"]["id"], "req_1");
        assert_eq!(records[1]["request"]["id"], "req_2");
    }

    /// 损坏的日志文件按空日志处理，不与损坏内容合并
    #[tokio::test]
    async fn test_corrupt_file_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        tokio::fs::write(&path, "not valid json {{{").await.unwrap();

        let store = LogFileStore::new(RequestLogConfig {
            log_path: path,
            ..Default::default()
        });
        store.append(test_record("req_1")).await.unwrap();

        let records = read_records(store.path()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["request"]["id"], "req_1");
    }

    /// 禁用持久化时不创建文件
    #[tokio::test]
    async fn test_disabled_store_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");

        let store = LogFileStore::new(RequestLogConfig {
            log_path: path.clone(),
            enabled: false,
            ..Default::default()
        });
        store.append(test_record("req_1")).await.unwrap();

        assert!(!path.exists());
    }

    /// 非格式化模式写出紧凑 JSON
    #[tokio::test]
    async fn test_compact_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogFileStore::new(RequestLogConfig {
            log_path: dir.path().join("log.json"),
            pretty: false,
            ..Default::default()
        });

        store.append(test_record("req_1")).await.unwrap();

        let content = tokio::fs::read_to_string(store.path()).await.unwrap();
        assert!(!content.contains('\n'));
    }
}
