mod discovery;
mod io;
mod mapper;
mod models;

use async_trait::async_trait;
use futures::StreamExt;

use crate::{ChunkStream, GenerateRequest, LmClient, Message, Result};

/// Connection settings for the local inference daemon (spec §6: `ollama.
/// {url, timeout_seconds}`, and env overrides `OLLAMA_URL`).
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub bearer_token: Option<String>,
}

impl OllamaConfig {
    pub const DEFAULT_URL: &'static str = "http://localhost:11434";
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OLLAMA_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_string()),
            timeout_seconds: Self::DEFAULT_TIMEOUT_SECONDS,
            bearer_token: std::env::var("OLLAMA_BEARER_TOKEN").ok(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_URL.to_string(),
            timeout_seconds: Self::DEFAULT_TIMEOUT_SECONDS,
            bearer_token: None,
        }
    }
}

/// The concrete `LmClient` backed by a local Ollama daemon.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl LmClient for OllamaClient {
    async fn probe(&self, model: &str) -> Result<bool> {
        discovery::model_exists(self, model).await
    }

    async fn stream_generate(&self, request: GenerateRequest) -> Result<ChunkStream> {
        let body = models::GenerateWireRequest {
            model: request.model,
            prompt: request.prompt,
            system: request.system_prompt,
            stream: true,
        };
        let lines = io::post_jsonl(self, "/api/generate", &body).await?;
        let chunks = lines.map(|line| line.and_then(|l| mapper::map_generate_line(&l)));
        Ok(Box::pin(chunks))
    }

    async fn stream_chat(&self, model: &str, messages: &[Message]) -> Result<ChunkStream> {
        let body = models::ChatWireRequest {
            model: model.to_string(),
            messages: messages.iter().map(models::ChatWireMessage::from).collect(),
            stream: true,
        };
        let lines = io::post_jsonl(self, "/api/chat", &body).await?;
        let chunks = lines.map(|line| line.and_then(|l| mapper::map_chat_line(&l)));
        Ok(Box::pin(chunks))
    }

    async fn embeddings(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let body = models::EmbeddingsWireRequest {
            model: model.to_string(),
            prompt: input.to_string(),
        };
        let response: models::EmbeddingsWireResponse =
            io::post_json(self, "/api/embeddings", &body).await?;
        Ok(response.embedding)
    }
}
