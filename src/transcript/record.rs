//! Typed view of Claude Code transcript lines
//!
//! Each JSONL line is classified into one of three record kinds. Everything
//! else (summaries, system lines, file-history snapshots, ...) is ignored.
//!
//! ```text
//! {"type":"user","message":{"role":"user","content":"hi"},"timestamp":"..."}      -> User
//! {"type":"user","message":{"content":[{"type":"tool_result",...}]},...}           -> ToolResult
//! {"type":"assistant","message":{"id":"msg_1","model":"...","content":[...]},...}  -> Assistant
//! ```

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// One block of message content
///
/// Blocks of a type we don't know are kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),
    Thinking(String),
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: Option<String>,
        content: Value,
    },
    Image,
    Unknown(Value),
}

impl ContentBlock {
    /// Parse a single entry of a content list
    pub fn from_value(value: &Value) -> Self {
        let obj = match value {
            Value::String(s) => return ContentBlock::Text(s.clone()),
            Value::Object(obj) => obj,
            other => return ContentBlock::Unknown(other.clone()),
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("text") => ContentBlock::Text(str_field(obj, "text")),
            Some("thinking") => ContentBlock::Thinking(str_field(obj, "thinking")),
            Some("tool_use") => ContentBlock::ToolUse {
                id: str_field(obj, "id"),
                name: obj
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                input: obj
                    .get("input")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            },
            Some("tool_result") => ContentBlock::ToolResult {
                tool_use_id: obj
                    .get("tool_use_id")
                    .and_then(Value::as_str)
                    .map(String::from),
                content: obj.get("content").cloned().unwrap_or(Value::Null),
            },
            Some("image") => ContentBlock::Image,
            _ => ContentBlock::Unknown(value.clone()),
        }
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parse message content, which is either a plain string or a list of blocks
pub fn parse_content(content: Option<&Value>) -> Vec<ContentBlock> {
    match content {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![ContentBlock::Text(s.clone())],
        Some(Value::Array(items)) => items.iter().map(ContentBlock::from_value).collect(),
        Some(other) => vec![ContentBlock::Unknown(other.clone())],
    }
}

/// Join the text blocks of a message with newlines
pub fn text_of(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Token usage reported by the provider for one assistant message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub input_tokens: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub output_tokens: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub cache_creation_input_tokens: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub service_tier: Option<String>,
}

/// Counters are sometimes written as `null`
fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// A user turn start
#[derive(Debug, Clone, PartialEq)]
pub struct UserMessage {
    pub content: Vec<ContentBlock>,
    pub timestamp: Option<String>,
}

impl UserMessage {
    pub fn text(&self) -> String {
        text_of(&self.content)
    }
}

/// Extra fields Claude Code attaches to tool results (`toolUseResult`)
///
/// Values are kept exactly as written so they can be surfaced verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResultMeta {
    pub duration_ms: Option<Value>,
    pub num_files: Option<Value>,
    pub filenames: Option<Value>,
    pub truncated: Option<Value>,
}

impl ToolResultMeta {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(obj) = value.and_then(Value::as_object) else {
            return Self::default();
        };
        Self {
            duration_ms: obj.get("durationMs").cloned(),
            num_files: obj.get("numFiles").cloned(),
            filenames: obj.get("filenames").cloned(),
            truncated: obj.get("truncated").cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.duration_ms.is_none()
            && self.num_files.is_none()
            && self.filenames.is_none()
            && self.truncated.is_none()
    }

    /// Span metadata representation (snake_case keys)
    pub fn to_metadata(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let fields = [
            ("duration_ms", &self.duration_ms),
            ("num_files", &self.num_files),
            ("filenames", &self.filenames),
            ("truncated", &self.truncated),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                map.insert(key.to_string(), v.clone());
            }
        }
        map
    }

    /// Tool duration in seconds, when a non-zero `durationMs` was reported
    pub fn latency_secs(&self) -> Option<f64> {
        self.duration_ms
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|ms| *ms != 0.0)
            .map(|ms| ms / 1000.0)
    }
}

/// A user-role line that carries tool results rather than a new prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultRecord {
    pub content: Vec<ContentBlock>,
    pub timestamp: Option<String>,
    pub metadata: ToolResultMeta,
}

impl ToolResultRecord {
    /// (tool_use_id, result content) pairs carried by this record
    pub fn results(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolResult {
                tool_use_id: Some(id),
                content,
            } => Some((id.as_str(), content)),
            _ => None,
        })
    }
}

/// One streamed chunk of an assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantFragment {
    pub message_id: Option<String>,
    pub content: Vec<ContentBlock>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
    pub request_id: Option<String>,
    pub stop_reason: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    User(UserMessage),
    ToolResult(ToolResultRecord),
    Assistant(AssistantFragment),
}

/// Role of a line: top-level `type`, falling back to `message.role`
fn role_of(line: &Value) -> Option<&str> {
    line.get("type")
        .and_then(Value::as_str)
        .or_else(|| line.get("message")?.get("role")?.as_str())
}

/// Content of a line: `message.content` when there is a message, else `content`
fn raw_content(line: &Value) -> Option<&Value> {
    match line.get("message") {
        Some(message) => message.get("content"),
        None => line.get("content"),
    }
}

fn timestamp_of(line: &Value) -> Option<String> {
    line.get("timestamp")
        .and_then(Value::as_str)
        .map(String::from)
}

fn message_str(line: &Value, key: &str) -> Option<String> {
    line.get("message")?
        .get(key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Classify one parsed transcript line. Returns `None` for lines that are not
/// part of any turn.
pub fn classify(line: &Value) -> Option<Record> {
    match role_of(line)? {
        "user" => {
            let content = parse_content(raw_content(line));
            let timestamp = timestamp_of(line);
            let is_tool_result = content
                .iter()
                .any(|b| matches!(b, ContentBlock::ToolResult { .. }));

            if is_tool_result {
                Some(Record::ToolResult(ToolResultRecord {
                    content,
                    timestamp,
                    metadata: ToolResultMeta::from_value(line.get("toolUseResult")),
                }))
            } else {
                Some(Record::User(UserMessage { content, timestamp }))
            }
        }
        "assistant" => {
            let usage = line
                .get("message")
                .and_then(|m| m.get("usage"))
                .filter(|u| u.as_object().is_some_and(|o| !o.is_empty()))
                .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());

            let request_id = message_str(line, "requestId").or_else(|| {
                line.get("requestId")
                    .and_then(Value::as_str)
                    .map(String::from)
            });

            Some(Record::Assistant(AssistantFragment {
                message_id: message_str(line, "id"),
                content: parse_content(raw_content(line)),
                model: message_str(line, "model"),
                usage,
                request_id,
                stop_reason: message_str(line, "stop_reason"),
                timestamp: timestamp_of(line),
            }))
        }
        _ => None,
    }
}
