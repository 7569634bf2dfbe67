//! 在途请求追踪
//!
//! 按请求 ID 保存尚未完成的请求元数据。条目在会话开始时插入，
//! 完成时取出并删除，恰好消费一次；同一 ID 的第二次完成调用
//! 取不到条目，由门面回退到调用方提供的值

use std::collections::HashMap;

use parking_lot::Mutex;

use super::model::PendingRequest;

/// 在途请求追踪器
#[derive(Debug, Default)]
pub struct PendingTracker {
    entries: Mutex<HashMap<String, PendingRequest>>,
}

impl PendingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 无条件插入（ID 冲突时覆盖，按 ID 生成契约不应发生）
    pub fn put(&self, id: String, entry: PendingRequest) {
        self.entries.lock().insert(id, entry);
    }

    /// 取出并删除条目，不存在或已被消费时返回 None
    pub fn take(&self, id: &str) -> Option<PendingRequest> {
        self.entries.lock().remove(id)
    }

    /// 当前在途请求数
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
