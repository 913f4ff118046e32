//! Trace span model for Keywords AI trace ingestion
//!
//! One turn compiles to a small tree: a root `agent` span for the turn, with
//! `generation` children for thinking segments and `tool` children for tool
//! calls. Field names match the ingest API's wire format.

pub mod compiler;
pub mod format;

pub use compiler::{compile_turn, CompileContext, SCHEME};

use serde::Serialize;
use serde_json::{Map, Value};

/// Span kind, serialized as `log_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Agent,
    Generation,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptTokensDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,
}

/// Token usage, flattened into the root span
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub trace_unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_identifier: Option<String>,
    pub span_unique_id: String,
    /// `None` (serialized as null) only for the root span
    pub span_parent_id: Option<String>,
    pub span_name: String,
    pub span_workflow_name: String,
    pub log_type: SpanKind,
    pub input: String,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_messages: Option<Vec<ChatMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_message: Option<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: String,
    pub start_time: String,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    #[serde(flatten)]
    pub usage: Option<UsageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Span {
    pub fn is_root(&self) -> bool {
        self.span_parent_id.is_none()
    }
}
