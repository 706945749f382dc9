//! AI Integration Module
//!
//! Optional plan writing through an OpenAI-compatible chat completions API.
//! Callers always have the deterministic planner to fall back on.

pub mod client;
pub mod prompts;

pub use client::{AiClient, AiError, AiMode, TextGenerator};
