//! LM backend client for the flowdeck orchestration core (spec §6).
//!
//! The core only ever talks to one kind of external service: a local
//! inference daemon speaking the Ollama HTTP protocol. This crate is that
//! client — built the way the teacher builds a provider adapter
//! (`discovery` / `io` / `models` / `mapper`), for one backend instead of
//! the teacher's three, since spec §6 names exactly one.

mod client;
mod error;
mod ollama;

pub use client::{Chunk, GenerateRequest, LmClient, Message, MessageRole};
pub use error::{Error, Result};
pub use ollama::{OllamaClient, OllamaConfig};
