use serde::{Deserialize, Serialize};

use crate::{Message, MessageRole};

#[derive(Debug, Serialize)]
pub struct GenerateWireRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateWireLine {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: u64,
    #[serde(default)]
    pub eval_count: u64,
}

#[derive(Debug, Serialize)]
pub struct ChatWireMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<&Message> for ChatWireMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        Self {
            role,
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatWireRequest {
    pub model: String,
    pub messages: Vec<ChatWireMessage>,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatWireMessageBody {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatWireLine {
    #[serde(default)]
    pub message: Option<ChatWireMessageBody>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: u64,
    #[serde(default)]
    pub eval_count: u64,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingsWireRequest {
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingsWireResponse {
    pub embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct TagsWireResponse {
    pub models: Vec<TagWireEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TagWireEntry {
    pub name: String,
}
