//! Groups classified records into conversational turns
//!
//! A turn is one user prompt, the assistant messages that answer it and the
//! tool results produced along the way. Assistant messages arrive as several
//! streamed fragments sharing a message id; those are merged back into one
//! message here.
//!
//! Assembly is a fold over the records of a single run. Nothing carries over
//! between runs: a turn still open when the records run out is handed back as
//! [`PendingTurn`] and dropped by the caller.

use super::record::{
    text_of, AssistantFragment, ContentBlock, Record, ToolResultRecord, Usage, UserMessage,
};
use serde_json::Value;

/// A logical assistant message, merged from one or more fragments
///
/// Everything but the content comes from the first fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantMessage {
    pub id: Option<String>,
    pub content: Vec<ContentBlock>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
    pub request_id: Option<String>,
    pub stop_reason: Option<String>,
    pub timestamp: Option<String>,
}

impl AssistantMessage {
    fn start(fragment: AssistantFragment) -> Self {
        Self {
            id: fragment.message_id,
            content: fragment.content,
            model: fragment.model,
            usage: fragment.usage,
            request_id: fragment.request_id,
            stop_reason: fragment.stop_reason,
            timestamp: fragment.timestamp,
        }
    }

    fn absorb(&mut self, fragment: AssistantFragment) {
        self.content.extend(fragment.content);
    }

    pub fn text(&self) -> String {
        text_of(&self.content)
    }

    /// Tool invocations in this message: (id, name, input)
    pub fn tool_calls(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            }
            _ => None,
        })
    }

    /// Non-empty thinking segments in this message
    pub fn thinking(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::Thinking(t) if !t.is_empty() => Some(t.as_str()),
            _ => None,
        })
    }
}

/// A closed turn, ready for compilation
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub user: UserMessage,
    /// Empty only for degenerate turns produced in strict mode
    pub assistants: Vec<AssistantMessage>,
    pub tool_results: Vec<ToolResultRecord>,
}

/// Whatever was still open when the records ran out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingTurn {
    pub user: Option<UserMessage>,
    pub assistants: Vec<AssistantMessage>,
    pub tool_results: Vec<ToolResultRecord>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    /// Close a user message that is followed directly by another user
    /// message as a turn with no assistant output, instead of dropping it.
    pub strict: bool,
}

#[derive(Debug, Default)]
pub struct Assembly {
    /// Turns closed during this run, in order
    pub turns: Vec<Turn>,
    pub pending: Option<PendingTurn>,
}

#[derive(Debug, Default)]
struct Assembler {
    options: AssembleOptions,
    turns: Vec<Turn>,
    user: Option<UserMessage>,
    assistants: Vec<AssistantMessage>,
    in_progress: Option<AssistantMessage>,
    tool_results: Vec<ToolResultRecord>,
}

impl Assembler {
    fn new(options: AssembleOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    fn push(mut self, record: Record) -> Self {
        match record {
            Record::ToolResult(result) => self.tool_results.push(result),
            Record::User(user) => {
                self.finalize_message();
                self.close_turn();
                self.user = Some(user);
            }
            Record::Assistant(fragment) => self.push_fragment(fragment),
        }
        self
    }

    fn push_fragment(&mut self, fragment: AssistantFragment) {
        let continues = match (&self.in_progress, fragment.message_id.as_deref()) {
            (Some(_), None) => true,
            (Some(current), Some(id)) => current.id.as_deref() == Some(id),
            (None, _) => false,
        };

        if continues {
            if let Some(current) = self.in_progress.as_mut() {
                current.absorb(fragment);
            }
        } else {
            self.finalize_message();
            self.in_progress = Some(AssistantMessage::start(fragment));
        }
    }

    fn finalize_message(&mut self) {
        if let Some(message) = self.in_progress.take() {
            self.assistants.push(message);
        }
    }

    /// Close the open turn (if it is complete) and reset for the next one
    fn close_turn(&mut self) {
        let assistants = std::mem::take(&mut self.assistants);
        let tool_results = std::mem::take(&mut self.tool_results);

        match self.user.take() {
            Some(user) if !assistants.is_empty() || self.options.strict => {
                self.turns.push(Turn {
                    user,
                    assistants,
                    tool_results,
                });
            }
            Some(_) => {
                tracing::debug!("Dropping user message with no assistant reply");
            }
            None if !assistants.is_empty() => {
                tracing::debug!(
                    messages = assistants.len(),
                    "Dropping assistant output with no user message in this run"
                );
            }
            None => {}
        }
    }

    fn finish(mut self) -> Assembly {
        self.finalize_message();

        let complete = self.user.is_some() && !self.assistants.is_empty();
        if complete {
            self.close_turn();
            return Assembly {
                turns: self.turns,
                pending: None,
            };
        }

        let has_leftovers =
            self.user.is_some() || !self.assistants.is_empty() || !self.tool_results.is_empty();
        let pending = has_leftovers.then(|| PendingTurn {
            user: self.user.take(),
            assistants: std::mem::take(&mut self.assistants),
            tool_results: std::mem::take(&mut self.tool_results),
        });

        Assembly {
            turns: self.turns,
            pending,
        }
    }
}

/// Fold a run's records into closed turns
pub fn assemble<I>(records: I, options: AssembleOptions) -> Assembly
where
    I: IntoIterator<Item = Record>,
{
    records
        .into_iter()
        .fold(Assembler::new(options), Assembler::push)
        .finish()
}
