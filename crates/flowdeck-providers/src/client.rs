use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::Result;

/// A chat message in a multi-turn conversation (spec §6: "stream-chat
/// (multi-turn)").
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single-turn generation request (spec §6: "stream-generate
/// (single-turn)").
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
}

/// One piece of a streamed response. The backend's wire format is
/// newline-delimited JSON with a final record carrying `done: true` and
/// token counts (spec §6); `Chunk::Done` is that terminator.
#[derive(Debug, Clone)]
pub enum Chunk {
    Token(String),
    Done {
        prompt_tokens: u64,
        completion_tokens: u64,
    },
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Chunk>> + Send>>;

/// Provider-agnostic face the Model Coordinator drives (spec §6). Only one
/// concrete implementation exists today (`OllamaClient`), but the
/// orchestrator and judge code depend on this trait, not the concrete
/// type, the way `cloudllm::client_wrapper::ClientWrapper` decouples
/// callers from a specific vendor client.
#[async_trait]
pub trait LmClient: Send + Sync {
    /// Probe the backend for this client's configured model (spec §4.3:
    /// `Validate(ctx)` — "probe the LM backend for existence of every
    /// configured model").
    async fn probe(&self, model: &str) -> Result<bool>;

    /// Single-turn streaming generation.
    async fn stream_generate(&self, request: GenerateRequest) -> Result<ChunkStream>;

    /// Multi-turn streaming chat.
    async fn stream_chat(&self, model: &str, messages: &[Message]) -> Result<ChunkStream>;

    /// Embeddings for a single input string.
    async fn embeddings(&self, model: &str, input: &str) -> Result<Vec<f32>>;
}
