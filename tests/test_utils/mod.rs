#![allow(dead_code)]
//! Test utilities and fixtures for transcript-tracer tests

pub mod claude_settings;

use serde_json::{json, Value};

/// A plain user prompt line
pub fn user_line(text: &str, timestamp: &str) -> Value {
    json!({
        "type": "user",
        "sessionId": "sess-1",
        "message": {"role": "user", "content": text},
        "timestamp": timestamp
    })
}

/// An assistant fragment line with the given content blocks
pub fn assistant_line(id: &str, model: &str, content: Value, timestamp: &str) -> Value {
    json!({
        "type": "assistant",
        "sessionId": "sess-1",
        "requestId": "req_1",
        "message": {
            "id": id,
            "role": "assistant",
            "model": model,
            "content": content,
            "stop_reason": null,
            "usage": {"input_tokens": 10, "output_tokens": 5, "service_tier": "standard"}
        },
        "timestamp": timestamp
    })
}

/// A user-role line carrying one tool result
pub fn tool_result_line(tool_use_id: &str, content: &str, timestamp: &str) -> Value {
    json!({
        "type": "user",
        "sessionId": "sess-1",
        "message": {
            "role": "user",
            "content": [{"type": "tool_result", "tool_use_id": tool_use_id, "content": content}]
        },
        "toolUseResult": {"durationMs": 1500, "numFiles": 1},
        "timestamp": timestamp
    })
}

pub fn text(s: &str) -> Value {
    json!({"type": "text", "text": s})
}

pub fn thinking(s: &str) -> Value {
    json!({"type": "thinking", "thinking": s})
}

pub fn tool_use(id: &str, name: &str, input: Value) -> Value {
    json!({"type": "tool_use", "id": id, "name": name, "input": input})
}

/// Serialize lines as a JSONL transcript
pub fn jsonl(lines: &[Value]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}

/// One complete turn: prompt and a text answer
pub fn simple_turn(n: usize) -> Vec<Value> {
    vec![
        user_line(&format!("question {}", n), "2024-01-01T00:00:00Z"),
        assistant_line(
            &format!("msg_{}", n),
            "claude-sonnet",
            json!([text(&format!("answer {}", n))]),
            "2024-01-01T00:00:01Z",
        ),
    ]
}
