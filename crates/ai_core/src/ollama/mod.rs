//! Ollama chat backend
//!
//! Streams `/api/chat` answers as newline-delimited JSON.

mod client;
mod streaming;

pub use client::OllamaInferenceEngine;
pub use streaming::NdjsonDecoder;
