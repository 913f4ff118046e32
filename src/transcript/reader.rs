//! Incremental reading of an append-only transcript

use serde_json::Value;

/// Lines appended since the last run
#[derive(Debug, Default)]
pub struct NewLines {
    /// Parsed JSON objects, in file order
    pub records: Vec<Value>,
    /// Line count of the whole file; the cursor to store after this read
    pub total_lines: usize,
}

impl NewLines {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read the lines of `content` past `cursor`.
///
/// Blank lines and lines that are not a JSON object (corruption, a partially
/// flushed trailing write) are skipped; they still count towards the cursor.
pub fn read_new_lines(content: &str, cursor: usize) -> NewLines {
    let lines: Vec<&str> = content.trim_end().lines().collect();
    let total_lines = lines.len();

    if cursor >= total_lines {
        tracing::debug!(cursor, total_lines, "No new lines to process");
        return NewLines {
            records: Vec::new(),
            total_lines,
        };
    }

    let records = lines[cursor..]
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(offset, line)| match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => Some(value),
            Ok(_) => {
                tracing::debug!(line = cursor + offset + 1, "Skipping non-object line");
                None
            }
            Err(e) => {
                tracing::debug!(line = cursor + offset + 1, "Skipping unparseable line: {}", e);
                None
            }
        })
        .collect();

    NewLines {
        records,
        total_lines,
    }
}
