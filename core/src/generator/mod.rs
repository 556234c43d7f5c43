//! Advisory text generation: a hosted model behind single-shot and
//! incremental modes.
//!
//! This module provides:
//! - `AdviceGenerator`, the capability the orchestrator depends on
//! - `GenerationEvent` / `FragmentStream`, the tagged incremental protocol
//! - `GeminiGenerator`, a client for the Gemini REST API
//! - `SseDecoder`, used to split `text/event-stream` bodies into payloads

mod gemini;
mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::Result;

pub use gemini::GeminiGenerator;
pub use sse::SseDecoder;

/// One element pulled from an incremental generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// A piece of generated text, in emission order
    Fragment(String),
    /// The model finished normally; nothing follows
    End,
}

/// Lazy, forward-only sequence of generation events.
///
/// A well-formed stream yields zero or more `Ok(Fragment)` items followed by
/// exactly one `Ok(End)`, or stops after a single `Err`.
pub type FragmentStream = BoxStream<'static, Result<GenerationEvent>>;

#[async_trait]
pub trait AdviceGenerator: Send + Sync {
    /// Run the model to completion and return the whole text.
    async fn generate_once(&self, prompt: &str) -> Result<String>;

    /// Start an incremental generation.
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream>;
}
