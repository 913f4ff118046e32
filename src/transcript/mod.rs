//! Claude Code transcript parsing
//!
//! Pipeline, leaf first:
//! 1. `reader` returns the lines appended since the stored cursor
//! 2. `record` classifies each line as user prompt, tool result or assistant fragment
//! 3. `assembler` folds the records into complete turns

pub mod assembler;
pub mod reader;
pub mod record;

pub use assembler::{assemble, AssembleOptions, Assembly, AssistantMessage, PendingTurn, Turn};
pub use reader::{read_new_lines, NewLines};
pub use record::{classify, ContentBlock, Record};
