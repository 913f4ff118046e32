//! Human-readable rendering of tool inputs and outputs
//!
//! All limits count characters, not bytes.

use serde_json::Value;

/// Cap for any rendered input or output
pub const MAX_FIELD_CHARS: usize = 4000;
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Cap for the file content preview of Write/Edit inputs
const CONTENT_PREVIEW_CHARS: usize = 2000;
/// Cap for a content block of an unrecognized shape
const BLOCK_FALLBACK_CHARS: usize = 500;
/// A partially fitting text block is only kept if more than this remains
const MIN_TAIL_CHARS: usize = 100;

/// Longest prefix of `s` with at most `max` characters
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// `s` capped at `max` characters, with the truncation marker appended when cut
pub fn cap_with_marker(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}{}", truncate_chars(s, max), TRUNCATION_MARKER)
    } else {
        s.to_string()
    }
}

/// Null, false, zero and empty strings/lists/objects render as nothing
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Strings render raw, everything else as compact JSON
fn plain(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn pretty_capped(value: &Value) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => cap_with_marker(&pretty, MAX_FIELD_CHARS),
        Err(_) => truncate_chars(&value.to_string(), MAX_FIELD_CHARS).to_string(),
    }
}

fn path_of(input: &Value) -> String {
    plain(input.get("file_path").or_else(|| input.get("path")))
}

/// Render a tool call's input, specialised for the common file and shell tools
pub fn format_tool_input(tool_name: &str, input: &Value) -> String {
    if is_blank(input) {
        return String::new();
    }

    if input.is_object() {
        match tool_name {
            "Write" | "Edit" | "MultiEdit" => {
                let mut rendered = format!("File: {}\n", path_of(input));
                let content = plain(input.get("content"));
                if !content.is_empty() {
                    let preview = if content.chars().count() > CONTENT_PREVIEW_CHARS {
                        format!("{}...", truncate_chars(&content, CONTENT_PREVIEW_CHARS))
                    } else {
                        content
                    };
                    rendered.push_str("Content:\n");
                    rendered.push_str(&preview);
                }
                return truncate_chars(&rendered, MAX_FIELD_CHARS).to_string();
            }
            "Read" => return format!("File: {}", path_of(input)),
            "Bash" | "Shell" => return format!("Command: {}", plain(input.get("command"))),
            _ => {}
        }
    }

    pretty_capped(input)
}

/// Render a tool result's content
pub fn format_tool_output(output: &Value) -> String {
    if is_blank(output) {
        return String::new();
    }

    match output {
        Value::String(s) => cap_with_marker(s, MAX_FIELD_CHARS),
        Value::Array(items) => format_block_list(items),
        Value::Object(obj) if obj.contains_key("success") => {
            let success = match obj.get("success") {
                Some(Value::Bool(b)) => b.to_string(),
                other => plain(other),
            };
            format!("Success: {}\n{}", success, plain(obj.get("message")))
        }
        Value::Object(_) => pretty_capped(output),
        other => truncate_chars(&plain(Some(other)), MAX_FIELD_CHARS).to_string(),
    }
}

/// Concatenate the text of a content block list within the field budget
fn format_block_list(items: &[Value]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut used = 0usize;

    for item in items {
        let text = match item {
            Value::Object(obj) => match obj.get("type").and_then(Value::as_str) {
                Some("text") => plain(obj.get("text")),
                Some("image") => {
                    parts.push("[Image output]".to_string());
                    continue;
                }
                _ => {
                    let fallback =
                        truncate_chars(&item.to_string(), BLOCK_FALLBACK_CHARS).to_string();
                    used += fallback.chars().count();
                    parts.push(fallback);
                    continue;
                }
            },
            Value::String(s) => s.clone(),
            _ => continue,
        };

        let len = text.chars().count();
        if used + len > MAX_FIELD_CHARS {
            let remaining = MAX_FIELD_CHARS.saturating_sub(used);
            if remaining > MIN_TAIL_CHARS {
                parts.push(format!("{}... (truncated)", truncate_chars(&text, remaining)));
            }
            break;
        }
        used += len;
        parts.push(text);
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_chars_utf8_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("こんにちは", 3), "こんに");
    }

    #[test]
    fn test_output_string_boundary() {
        let exact = "x".repeat(4000);
        assert_eq!(format_tool_output(&json!(exact)), exact);

        let over = "x".repeat(4001);
        let rendered = format_tool_output(&json!(over));
        assert_eq!(rendered, format!("{}{}", "x".repeat(4000), TRUNCATION_MARKER));
    }

    #[test]
    fn test_blank_values_render_empty() {
        assert_eq!(format_tool_output(&Value::Null), "");
        assert_eq!(format_tool_output(&json!([])), "");
        assert_eq!(format_tool_output(&json!("")), "");
        assert_eq!(format_tool_input("Bash", &json!({})), "");
        assert_eq!(format_tool_input("Bash", &Value::Null), "");
    }

    #[test]
    fn test_write_input() {
        let input = json!({"file_path": "/tmp/a.txt", "content": "hello"});
        assert_eq!(
            format_tool_input("Write", &input),
            "File: /tmp/a.txt\nContent:\nhello"
        );
    }

    #[test]
    fn test_write_input_long_content_preview() {
        let input = json!({"path": "/tmp/b.txt", "content": "y".repeat(2500)});
        let rendered = format_tool_input("Write", &input);
        assert!(rendered.starts_with("File: /tmp/b.txt\nContent:\n"));
        assert!(rendered.ends_with("..."));
        assert_eq!(
            rendered.chars().count(),
            "File: /tmp/b.txt\nContent:\n".len() + 2000 + 3
        );
    }

    #[test]
    fn test_edit_input_without_content() {
        let input = json!({"file_path": "src/lib.rs", "old_string": "a", "new_string": "b"});
        assert_eq!(format_tool_input("Edit", &input), "File: src/lib.rs\n");
    }

    #[test]
    fn test_read_and_bash_inputs() {
        assert_eq!(
            format_tool_input("Read", &json!({"file_path": "/x/y.rs", "limit": 10})),
            "File: /x/y.rs"
        );
        assert_eq!(
            format_tool_input("Bash", &json!({"command": "cargo fmt", "timeout": 5})),
            "Command: cargo fmt"
        );
        assert_eq!(
            format_tool_input("Shell", &json!({"command": "ls"})),
            "Command: ls"
        );
    }

    #[test]
    fn test_other_input_pretty_json_in_order() {
        let input = json!({"pattern": "TODO", "glob": "*.rs"});
        assert_eq!(
            format_tool_input("Grep", &input),
            "{\n  \"pattern\": \"TODO\",\n  \"glob\": \"*.rs\"\n}"
        );
    }

    #[test]
    fn test_other_input_capped() {
        let input = json!({"query": "z".repeat(5000)});
        let rendered = format_tool_input("WebSearch", &input);
        assert!(rendered.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            rendered.chars().count(),
            MAX_FIELD_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn test_block_list_output() {
        let output = json!([
            {"type": "text", "text": "first"},
            {"type": "image", "source": {"data": "..."}},
            "second"
        ]);
        assert_eq!(format_tool_output(&output), "first\n[Image output]\nsecond");
    }

    #[test]
    fn test_block_list_budget_cut_mid_block() {
        let output = json!([
            {"type": "text", "text": "a".repeat(3000)},
            {"type": "text", "text": "b".repeat(3000)},
            {"type": "text", "text": "never"}
        ]);
        let rendered = format_tool_output(&output);
        let expected = format!("{}\n{}... (truncated)", "a".repeat(3000), "b".repeat(1000));
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_block_list_small_tail_dropped() {
        let output = json!([
            {"type": "text", "text": "a".repeat(3950)},
            {"type": "text", "text": "b".repeat(200)}
        ]);
        assert_eq!(format_tool_output(&output), "a".repeat(3950));
    }

    #[test]
    fn test_block_list_unknown_shape_fallback() {
        let output = json!([{"type": "tool_reference", "name": "x"}]);
        assert_eq!(
            format_tool_output(&output),
            r#"{"type":"tool_reference","name":"x"}"#
        );
    }

    #[test]
    fn test_success_object_output() {
        let output = json!({"success": true, "message": "Wrote 3 lines"});
        assert_eq!(format_tool_output(&output), "Success: true\nWrote 3 lines");

        let failed = json!({"success": false});
        assert_eq!(format_tool_output(&failed), "Success: false\n");
    }

    #[test]
    fn test_object_output_pretty() {
        let output = json!({"stdout": "ok", "code": 0});
        assert_eq!(
            format_tool_output(&output),
            "{\n  \"stdout\": \"ok\",\n  \"code\": 0\n}"
        );
    }

    #[test]
    fn test_scalar_output() {
        assert_eq!(format_tool_output(&json!(42)), "42");
        assert_eq!(format_tool_output(&json!(true)), "true");
    }
}
