//! Transcript Tracer - turns Claude Code transcripts into Keywords AI traces
//!
//! This library crate exposes internal modules for integration testing.

pub mod config;
pub mod integrations;
pub mod logging;
pub mod pipeline;
pub mod spans;
pub mod state;
pub mod transcript;
