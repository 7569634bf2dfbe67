//! 公共工具模块

use std::sync::atomic::{AtomicU64, Ordering};

/// 请求 ID 随机后缀字符集（base-36）
const ID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 随机后缀长度
const ID_SUFFIX_LEN: usize = 9;

/// 上一次生成 ID 时使用的毫秒时间戳，保证进程内单调不减
static LAST_ID_MILLIS: AtomicU64 = AtomicU64::new(0);

/// 生成进程内唯一的请求 ID
///
/// 格式: `req_<毫秒时间戳>_<9 位 base-36 随机后缀>`，
/// 时间戳部分单调不减，随机后缀保证并发调用不冲突
pub fn new_request_id() -> String {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let prev = LAST_ID_MILLIS.fetch_max(now, Ordering::Relaxed);
    let millis = prev.max(now);

    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_CHARSET[fastrand::usize(..ID_CHARSET.len())] as char)
        .collect();

    format!("req_{}_{}", millis, suffix)
}

/// 格式化当前本地时间为 `YYYY-MM-DD hh:mm:ss`
pub fn format_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
