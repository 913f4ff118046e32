//! External systems: Claude Code on the input side, Keywords AI on the output side

pub mod claude;
pub mod keywords;
