//! Compiles one assembled turn into its span tree
//!
//! ```text
//! turn_{n}_chat                 agent       user prompt -> final assistant text
//! ├── turn_{n}_thinking_{k}     generation  one per thinking segment
//! └── turn_{n}_tool_{k}         tool        one per distinct tool_use id
//! ```
//!
//! Compilation never fails. Missing timestamps fall back to the context's
//! `now`, a missing model to [`DEFAULT_MODEL`].

use super::format::{format_tool_input, format_tool_output};
use super::{ChatMessage, PromptTokensDetails, Span, SpanKind, UsageSummary};
use crate::transcript::record::{ToolResultMeta, Usage};
use crate::transcript::Turn;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Tag identifying spans produced by this integration
pub const SCHEME: &str = "claudecode";

pub const DEFAULT_MODEL: &str = "claude";

/// Per-turn inputs that do not come from the transcript itself
#[derive(Debug, Clone)]
pub struct CompileContext<'a> {
    pub session_id: &'a str,
    /// 1-based, counted across the whole session
    pub turn_number: u64,
    pub now: DateTime<Utc>,
}

impl CompileContext<'_> {
    pub fn trace_id(&self) -> String {
        format!("{}_turn_{}", self.session_id, self.turn_number)
    }

    pub fn workflow_name(&self) -> String {
        format!("{}_{}", SCHEME, self.session_id)
    }

    pub fn root_span_id(&self) -> String {
        format!("turn_{}_chat", self.turn_number)
    }

    fn now_string(&self) -> String {
        self.now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

/// Parse an ISO-8601 timestamp; naive timestamps are taken as UTC
pub fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok().or_else(|| {
        NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

fn seconds_between(start: &str, end: &str) -> Option<f64> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;
    (end - start)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
}

fn summarize_usage(usage: &Usage) -> UsageSummary {
    let total = usage.input_tokens + usage.output_tokens;

    let cache_creation = (usage.cache_creation_input_tokens > 0)
        .then_some(usage.cache_creation_input_tokens);
    let cache_read = (usage.cache_read_input_tokens > 0).then_some(usage.cache_read_input_tokens);

    let details = (cache_creation.is_some() || cache_read.is_some()).then(|| PromptTokensDetails {
        cache_creation_tokens: cache_creation,
        cached_tokens: cache_read,
    });

    UsageSummary {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: (total > 0).then_some(total),
        cache_creation_prompt_tokens: cache_creation,
        prompt_tokens_details: details,
    }
}

/// A tool call and, once correlated, its result
struct ToolCall<'a> {
    name: &'a str,
    input: &'a Value,
    timestamp: Option<&'a str>,
    result: Option<ToolOutcome<'a>>,
}

struct ToolOutcome<'a> {
    output: &'a Value,
    metadata: &'a ToolResultMeta,
    timestamp: Option<&'a str>,
}

/// Tool calls of a turn keyed by tool-use id, in first-seen order
fn collect_tool_calls(turn: &Turn) -> Vec<ToolCall<'_>> {
    let mut calls: Vec<ToolCall<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for message in &turn.assistants {
        for (id, name, input) in message.tool_calls() {
            let call = ToolCall {
                name,
                input,
                timestamp: message.timestamp.as_deref(),
                result: None,
            };
            match index.get(id).copied() {
                Some(slot) => calls[slot] = call,
                None => {
                    index.insert(id, calls.len());
                    calls.push(call);
                }
            }
        }
    }

    for record in &turn.tool_results {
        for (id, output) in record.results() {
            if let Some(&slot) = index.get(id) {
                calls[slot].result = Some(ToolOutcome {
                    output,
                    metadata: &record.metadata,
                    timestamp: record.timestamp.as_deref(),
                });
            }
        }
    }

    calls
}

/// Compile a closed turn into its ordered span list: root, thinking, tools
pub fn compile_turn(turn: &Turn, ctx: &CompileContext<'_>) -> Vec<Span> {
    let trace_id = ctx.trace_id();
    let workflow_name = ctx.workflow_name();
    let root_id = ctx.root_span_id();
    let now = ctx.now_string();

    let first = turn.assistants.first();
    let user_text = turn.user.text();
    let final_output = turn.assistants.last().map(|m| m.text()).unwrap_or_default();

    let user_ts = turn.user.timestamp.as_deref();
    let assistant_ts = first.and_then(|m| m.timestamp.as_deref());

    let start_time = user_ts.or(assistant_ts).unwrap_or(now.as_str()).to_string();
    let timestamp = assistant_ts.unwrap_or(now.as_str()).to_string();
    let latency = match (user_ts, assistant_ts) {
        (Some(u), Some(a)) => seconds_between(u, a),
        _ => None,
    };

    let mut metadata = Map::new();
    metadata.insert("claude_code_turn".to_string(), Value::from(ctx.turn_number));
    if let Some(request_id) = first.and_then(|m| m.request_id.as_deref()) {
        metadata.insert("request_id".to_string(), Value::from(request_id));
    }
    if let Some(stop_reason) = first.and_then(|m| m.stop_reason.as_deref()) {
        metadata.insert("stop_reason".to_string(), Value::from(stop_reason));
    }
    let usage = first.and_then(|m| m.usage.as_ref());
    if let Some(tier) = usage.and_then(|u| u.service_tier.as_deref()) {
        metadata.insert("service_tier".to_string(), Value::from(tier));
    }

    let prompt_messages: Vec<ChatMessage> = if user_text.is_empty() {
        Vec::new()
    } else {
        vec![ChatMessage::new("user", user_text)]
    };
    let completion_message =
        (!final_output.is_empty()).then(|| ChatMessage::new("assistant", final_output));

    let input = if prompt_messages.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&prompt_messages).unwrap_or_default()
    };
    let output = completion_message
        .as_ref()
        .and_then(|m| serde_json::to_string(m).ok())
        .unwrap_or_default();

    let mut spans = vec![Span {
        trace_unique_id: trace_id.clone(),
        thread_identifier: Some(workflow_name.clone()),
        span_unique_id: root_id.clone(),
        span_parent_id: None,
        span_name: format!("{}_{}", SCHEME, trace_id),
        span_workflow_name: workflow_name.clone(),
        log_type: SpanKind::Agent,
        input,
        output,
        prompt_messages: Some(prompt_messages),
        completion_message,
        model: Some(
            first
                .and_then(|m| m.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        ),
        timestamp: timestamp.clone(),
        start_time: start_time.clone(),
        latency,
        usage: usage.map(summarize_usage),
        metadata: Some(metadata),
    }];

    let thinking = turn.assistants.iter().flat_map(|message| {
        message
            .thinking()
            .map(move |text| (text, message.timestamp.as_deref()))
    });
    for (k, (text, ts)) in thinking.enumerate() {
        let k = k + 1;
        let ts = ts.unwrap_or(timestamp.as_str()).to_string();
        spans.push(Span {
            trace_unique_id: trace_id.clone(),
            thread_identifier: None,
            span_unique_id: format!("turn_{}_thinking_{}", ctx.turn_number, k),
            span_parent_id: Some(root_id.clone()),
            span_name: format!("Thinking {}", k),
            span_workflow_name: workflow_name.clone(),
            log_type: SpanKind::Generation,
            input: String::new(),
            output: text.to_string(),
            prompt_messages: None,
            completion_message: None,
            model: None,
            timestamp: ts.clone(),
            start_time: ts,
            latency: None,
            usage: None,
            metadata: None,
        });
    }

    for (k, call) in collect_tool_calls(turn).into_iter().enumerate() {
        let k = k + 1;
        let result = call.result.as_ref();

        let span_ts = result
            .and_then(|r| r.timestamp)
            .or(call.timestamp)
            .unwrap_or(timestamp.as_str())
            .to_string();
        let span_start = call.timestamp.unwrap_or(start_time.as_str()).to_string();

        let tool_metadata = result
            .map(|r| r.metadata)
            .filter(|m| !m.is_empty());

        spans.push(Span {
            trace_unique_id: trace_id.clone(),
            thread_identifier: None,
            span_unique_id: format!("turn_{}_tool_{}", ctx.turn_number, k),
            span_parent_id: Some(root_id.clone()),
            span_name: format!("Tool: {}", call.name),
            span_workflow_name: workflow_name.clone(),
            log_type: SpanKind::Tool,
            input: format_tool_input(call.name, call.input),
            output: result
                .map(|r| format_tool_output(r.output))
                .unwrap_or_default(),
            prompt_messages: None,
            completion_message: None,
            model: None,
            timestamp: span_ts,
            start_time: span_start,
            latency: tool_metadata.and_then(ToolResultMeta::latency_secs),
            usage: None,
            metadata: tool_metadata.map(ToolResultMeta::to_metadata),
        });
    }

    spans
}
