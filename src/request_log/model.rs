//! 日志记录数据模型

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 一条完整的审计日志记录（写入后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// 本地时间，格式 `YYYY-MM-DD hh:mm:ss`
    pub timestamp: String,
    pub request: RequestRecord,
    pub response: ResponseRecord,
}

/// 请求部分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub id: String,
    pub url: String,
    pub model: String,
    pub stream: bool,
    pub has_function_call: bool,
    pub payload: RequestPayload,
}

/// 归一化后的请求体
///
/// 已知字段提升为命名属性，调用方传入的其余字段按原名原样保留在
/// `extra` 中（序列化时展平），保证对新增上游字段的前向兼容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestPayload {
    /// 从调用方提供的原始请求体构建
    ///
    /// 非对象类型的请求体不做任何提升，返回空 payload
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let mut payload = Self::default();
        for (key, v) in obj {
            match key.as_str() {
                "messages" => payload.messages = Some(v.clone()),
                "tools" => payload.tools = Some(v.clone()),
                "tool_choice" => payload.tool_choice = Some(v.clone()),
                "temperature" if v.is_number() => payload.temperature = v.as_f64(),
                "max_tokens" if v.is_i64() => payload.max_tokens = v.as_i64(),
                _ => {
                    payload.extra.insert(key.clone(), v.clone());
                }
            }
        }
        payload
    }

    /// 请求是否携带工具定义
    pub fn has_tools(&self) -> bool {
        self.tools
            .as_ref()
            .and_then(Value::as_array)
            .map(|tools| !tools.is_empty())
            .unwrap_or(false)
    }

    /// 请求是否声明流式输出
    pub fn is_stream(&self) -> bool {
        self.extra
            .get("stream")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// 响应部分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub status: u16,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub choices: Vec<Choice>,
    /// 调用方补充的工具执行结果（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_responses: Option<Value>,
    /// 原始响应负载，始终保留，保证提取失败时不丢数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// 归一化后的单个候选回答
///
/// 本设计中 choices 至多一个元素（index 恒为 0）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    pub message: ChoiceMessage,
}

/// 候选回答的消息体
///
/// `reasoning_content` 与 `content` 来自同一段源文本：
/// 存在 `<thinking>` 标记时拆分，否则全部作为 `content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// 工具调用意图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: ToolCallFunction,
}

/// 工具调用的函数描述，arguments 统一为 JSON 编码字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: String,
}

/// Token 用量统计（snake_case / camelCase 两种拼写归一化后的结果）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<i64>,
}

impl Usage {
    /// 所有字段均缺失
    pub fn is_empty(&self) -> bool {
        self.prompt_tokens.is_none()
            && self.completion_tokens.is_none()
            && self.total_tokens.is_none()
    }
}

/// 在途请求元数据（按请求 ID 索引，完成时取出并删除）
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub url: String,
    pub model: String,
    pub request_data: Value,
    pub started_at: Instant,
}
