//! 响应归一化
//!
//! 不同上游对同一类数据（回答文本、思考文本、工具调用、完成原因、
//! token 用量）使用不同且部分重叠的字段布局。本模块按固定优先级
//! 确定唯一权威来源，归一化为统一的日志结构：
//!
//! 1. 转换后的候选格式 `convertedResponse.candidates[0]`
//! 2. OpenAI 兼容格式 `rawCompletion.choices[0]`（仅补充第 1 步缺失的字段）
//! 3. 流式响应 `streamChunks` + `finalResponse`（独立路径，按第 1 步解析）
//!
//! 归一化永不失败：无法识别的负载得到空 choices，
//! 原始负载始终原样保留在 `raw` 字段中

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::model::{Choice, ChoiceMessage, ResponseRecord, ToolCall, ToolCallFunction, Usage};

static THINKING_RE: OnceLock<Regex> = OnceLock::new();

fn thinking_re() -> &'static Regex {
    THINKING_RE.get_or_init(|| {
        Regex::new(r"(?s)<thinking>(.*?)</thinking>").expect("thinking 正则编译失败")
    })
}

/// 归一化过程中逐步填充的提取结果
#[derive(Default)]
struct Extracted {
    content: Option<String>,
    reasoning: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
    finish_reason: Option<String>,
    /// 是否命中过任何已知格式
    matched: bool,
}

/// 将上游响应负载归一化为日志响应记录
pub fn normalize_response(payload: &Value, latency_ms: u64) -> ResponseRecord {
    let mut extracted = Extracted::default();

    if is_stream_payload(payload) {
        // 流式响应只看最终聚合结果，与非流式路径互不组合
        if let Some(candidate) = payload.pointer("/finalResponse/candidates/0") {
            extract_candidate(candidate, &mut extracted);
        }
    } else {
        if let Some(candidate) = payload.pointer("/convertedResponse/candidates/0") {
            extract_candidate(candidate, &mut extracted);
        }
        if let Some(choice) = payload.pointer("/rawCompletion/choices/0") {
            extract_raw_choice(choice, &mut extracted);
        }
    }

    let choices = if extracted.matched {
        vec![Choice {
            index: 0,
            finish_reason: extracted.finish_reason,
            message: ChoiceMessage {
                role: "assistant".to_string(),
                reasoning_content: extracted.reasoning,
                content: extracted.content,
                tool_calls: extracted.tool_calls,
            },
        }]
    } else {
        Vec::new()
    };

    ResponseRecord {
        status: extract_status(payload),
        latency_ms,
        usage: extract_usage(payload),
        choices,
        tool_responses: None,
        raw: Some(payload.clone()),
    }
}

/// 负载形状是否表明这是一次流式交互
fn is_stream_payload(payload: &Value) -> bool {
    payload.get("streamChunks").is_some() && payload.get("finalResponse").is_some()
}

/// 解析候选格式：`content.parts` 中的文本片段按顺序以换行拼接，
/// functionCall 片段按顺序收集为工具调用，finishReason 缺失时默认 "stop"
fn extract_candidate(candidate: &Value, extracted: &mut Extracted) {
    extracted.matched = true;

    if let Some(parts) = candidate.pointer("/content/parts").and_then(Value::as_array) {
        let joined = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");
        if !joined.trim().is_empty() {
            let (reasoning, content) = split_thinking(&joined);
            extracted.reasoning = reasoning;
            extracted.content = content;
        }

        let millis = chrono::Utc::now().timestamp_millis();
        let calls: Vec<ToolCall> = parts
            .iter()
            .filter_map(|part| part.get("functionCall"))
            .enumerate()
            .map(|(index, call)| ToolCall {
                id: format!("call_{}_{}", millis, index),
                function: ToolCallFunction {
                    name: call
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    arguments: call
                        .get("args")
                        .map(|args| args.to_string())
                        .unwrap_or_else(|| "{}".to_string()),
                },
            })
            .collect();
        if !calls.is_empty() {
            extracted.tool_calls = Some(calls);
        }
    }

    extracted.finish_reason = Some(
        candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .unwrap_or("stop")
            .to_string(),
    );
}

/// 解析 OpenAI 兼容格式，只填充尚未提取到的字段，从不覆盖已有值
fn extract_raw_choice(choice: &Value, extracted: &mut Extracted) {
    extracted.matched = true;

    if extracted.content.is_none() && extracted.reasoning.is_none() {
        if let Some(text) = choice.pointer("/message/content").and_then(Value::as_str) {
            if !text.trim().is_empty() {
                let (reasoning, content) = split_thinking(text);
                extracted.reasoning = reasoning;
                extracted.content = content;
            }
        }
    }

    if extracted.tool_calls.is_none() {
        if let Some(calls) = choice.pointer("/message/tool_calls").and_then(Value::as_array) {
            let millis = chrono::Utc::now().timestamp_millis();
            let converted: Vec<ToolCall> = calls
                .iter()
                .enumerate()
                .map(|(index, call)| {
                    let function = call.get("function");
                    // arguments 已是字符串时原样透传，否则 JSON 序列化
                    let arguments = match function.and_then(|f| f.get("arguments")) {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => "{}".to_string(),
                    };
                    ToolCall {
                        id: call
                            .get("id")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("call_{}_{}", millis, index)),
                        function: ToolCallFunction {
                            name: function
                                .and_then(|f| f.get("name"))
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            arguments,
                        },
                    }
                })
                .collect();
            if !converted.is_empty() {
                extracted.tool_calls = Some(converted);
            }
        }
    }

    if extracted.finish_reason.is_none() {
        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            extracted.finish_reason = Some(reason.to_string());
        }
    }
}

/// 从文本中分离思考内容和回答内容
///
/// 取第一个非贪婪匹配的 `<thinking>...</thinking>` 块（去除首尾空白）
/// 作为思考内容；移除所有该类块后的剩余文本作为回答内容，为空则省略。
/// 无标记时整段文本（去除首尾空白）作为回答内容。
///
/// 返回 `(reasoning, content)`
pub fn split_thinking(text: &str) -> (Option<String>, Option<String>) {
    let re = thinking_re();
    match re.captures(text) {
        Some(caps) => {
            let reasoning = caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            let remainder = re.replace_all(text, "").trim().to_string();
            let content = (!remainder.is_empty()).then_some(remainder);
            (reasoning, content)
        }
        None => {
            let trimmed = text.trim();
            let content = (!trimmed.is_empty()).then(|| trimmed.to_string());
            (None, content)
        }
    }
}

/// 提取响应状态码，负载根部的数字 status 字段，缺失时默认 200
fn extract_status(payload: &Value) -> u16 {
    payload
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(200)
}

/// 归一化 token 用量统计
///
/// 接受负载顶层的 usage 或嵌套在 convertedResponse 下的 usage，
/// 每个字段 snake_case 与 camelCase 两种拼写中先出现的生效
fn extract_usage(payload: &Value) -> Option<Usage> {
    let usage_value = payload
        .get("usage")
        .or_else(|| payload.pointer("/convertedResponse/usage"))?;

    let field = |snake: &str, camel: &str| {
        usage_value
            .get(snake)
            .and_then(Value::as_i64)
            .or_else(|| usage_value.get(camel).and_then(Value::as_i64))
    };

    let usage = Usage {
        prompt_tokens: field("prompt_tokens", "promptTokens"),
        completion_tokens: field("completion_tokens", "completionTokens"),
        total_tokens: field("total_tokens", "totalTokens"),
    };
    (!usage.is_empty()).then_some(usage)
}
