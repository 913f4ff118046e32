//! Cursor and turn counter behaviour across repeated runs

mod test_utils;

use anyhow::Result;
use chrono::Utc;
use std::sync::Mutex;
use test_utils::*;
use transcript_tracer::integrations::keywords::SpanSink;
use transcript_tracer::pipeline::{compile_new_turns, process_session};
use transcript_tracer::spans::Span;
use transcript_tracer::state::{MemoryStore, SessionState, StateStore};
use transcript_tracer::transcript::AssembleOptions;

/// Sink that keeps every batch it is sent
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<Vec<Span>>>,
}

impl RecordingSink {
    fn trace_ids(&self) -> Vec<String> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch[0].trace_unique_id.clone())
            .collect()
    }
}

impl SpanSink for RecordingSink {
    async fn send(&self, spans: &[Span]) -> Result<()> {
        self.batches.lock().unwrap().push(spans.to_vec());
        Ok(())
    }
}

/// Sink that rejects every batch
struct FailingSink;

impl SpanSink for FailingSink {
    async fn send(&self, _spans: &[Span]) -> Result<()> {
        anyhow::bail!("connection refused")
    }
}

fn transcript(turns: usize) -> String {
    let lines: Vec<_> = (1..=turns).flat_map(simple_turn).collect();
    jsonl(&lines)
}

mod replay {
    use super::*;

    #[test]
    fn test_cursor_at_end_yields_nothing() {
        let content = transcript(2);
        let state = SessionState {
            last_line: 4,
            turn_count: 2,
            updated_at: None,
        };

        let pass = compile_new_turns("sess-1", &content, &state, AssembleOptions::default(), Utc::now());
        assert!(!pass.advanced);
        assert!(pass.turns.is_empty());
        assert_eq!(pass.state, state);
    }

    #[tokio::test]
    async fn test_second_run_sends_nothing() {
        let content = transcript(2);
        let store = MemoryStore::new();
        let sink = RecordingSink::default();

        let first = process_session("sess-1", &content, &store, &sink, AssembleOptions::default())
            .await
            .unwrap();
        let second = process_session("sess-1", &content, &store, &sink, AssembleOptions::default())
            .await
            .unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert_eq!(sink.trace_ids().len(), 2);
    }
}

mod partial_writes {
    use super::*;

    #[test]
    fn test_half_written_line_is_not_consumed() {
        let complete = transcript(1);
        let previous = SessionState {
            last_line: 2,
            turn_count: 1,
            updated_at: None,
        };
        let content = format!("{}{}", complete, r#"{"type":"user","message":{"content":"hal"#);

        let pass = compile_new_turns("sess-1", &content, &previous, AssembleOptions::default(), Utc::now());

        assert!(!pass.advanced);
        assert!(pass.turns.is_empty());
        assert_eq!(pass.state, previous);
    }

    #[tokio::test]
    async fn test_line_completed_later_is_processed() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();

        process_session("sess-1", &transcript(1), &store, &sink, AssembleOptions::default())
            .await
            .unwrap();

        let prompt = user_line("question 2", "2024-01-01T00:00:00Z").to_string();
        let partial = format!("{}{}", transcript(1), &prompt[..prompt.len() / 2]);

        let turns = process_session("sess-1", &partial, &store, &sink, AssembleOptions::default())
            .await
            .unwrap();
        assert_eq!(turns, 0);
        assert_eq!(store.load("sess-1").unwrap().last_line, 2);

        let turns = process_session("sess-1", &transcript(2), &store, &sink, AssembleOptions::default())
            .await
            .unwrap();
        assert_eq!(turns, 1);
        assert_eq!(sink.trace_ids(), vec!["sess-1_turn_1", "sess-1_turn_2"]);

        let state = store.load("sess-1").unwrap();
        assert_eq!(state.last_line, 4);
        assert_eq!(state.turn_count, 2);
    }
}

mod numbering {
    use super::*;

    #[tokio::test]
    async fn test_turn_numbers_continue_across_runs() {
        let store = MemoryStore::new();
        let sink = RecordingSink::default();

        process_session("sess-1", &transcript(2), &store, &sink, AssembleOptions::default())
            .await
            .unwrap();
        let state = store.load("sess-1").unwrap();
        assert_eq!(state.turn_count, 2);
        assert_eq!(state.last_line, 4);

        process_session("sess-1", &transcript(3), &store, &sink, AssembleOptions::default())
            .await
            .unwrap();

        assert_eq!(
            sink.trace_ids(),
            vec!["sess-1_turn_1", "sess-1_turn_2", "sess-1_turn_3"]
        );
        assert_eq!(store.load("sess-1").unwrap().turn_count, 3);
    }

    #[tokio::test]
    async fn test_sessions_counted_independently() {
        let store = MemoryStore::with_session(
            "other",
            SessionState {
                last_line: 10,
                turn_count: 5,
                updated_at: None,
            },
        );
        let sink = RecordingSink::default();

        process_session("sess-1", &transcript(1), &store, &sink, AssembleOptions::default())
            .await
            .unwrap();

        assert_eq!(sink.trace_ids(), vec!["sess-1_turn_1"]);
        assert_eq!(store.load("other").unwrap().turn_count, 5);
    }

    #[tokio::test]
    async fn test_trailing_prompt_is_not_reprocessed() {
        // A deferred prompt is consumed with the rest of the run
        let mut lines: Vec<_> = simple_turn(1);
        lines.push(user_line("unanswered", "2024-01-01T00:00:05Z"));
        let store = MemoryStore::new();
        let sink = RecordingSink::default();

        process_session("sess-1", &jsonl(&lines), &store, &sink, AssembleOptions::default())
            .await
            .unwrap();

        let state = store.load("sess-1").unwrap();
        assert_eq!(state.last_line, 3);
        assert_eq!(state.turn_count, 1);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_send_failure_still_advances_state() {
        let store = MemoryStore::new();

        let turns = process_session(
            "sess-1",
            &transcript(2),
            &store,
            &FailingSink,
            AssembleOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(turns, 2);
        let state = store.load("sess-1").unwrap();
        assert_eq!(state.last_line, 4);
        assert_eq!(state.turn_count, 2);
        assert!(state.updated_at.is_some());
    }
}
