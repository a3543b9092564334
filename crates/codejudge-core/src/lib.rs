//! Codejudge Core Library
//!
//! Staged LLM review of C submissions: structural feature extraction,
//! prompt rendering, resilient backend calls, structured-reply recovery,
//! scoring, report rendering and test-case generation.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod features;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod scoring;
pub mod source;
pub mod stage;
pub mod testgen;
pub mod text;
