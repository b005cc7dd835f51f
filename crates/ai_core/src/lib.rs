//! AI Core - streaming text generation
//!
//! Talks to an Ollama-compatible server and exposes the answer as a stream
//! of [`StreamingChunk`]s.

pub mod config;
pub mod error;
pub mod ollama;
pub mod ports;

pub use config::InferenceConfig;
pub use error::InferenceError;
pub use ollama::OllamaInferenceEngine;
pub use ports::{
    InferenceEngine, InferenceMessage, InferenceRequest, StreamingChunk, StreamingResponse,
};
