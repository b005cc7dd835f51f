//! NDJSON stream decoding
//!
//! The server writes one JSON object per line, but network frames do not
//! respect line boundaries: a frame may end mid-line or even mid-codepoint.
//! [`NdjsonDecoder`] buffers raw bytes and only parses complete lines.

use futures::{
    future,
    stream::{self, StreamExt},
};
use reqwest::Response;
use serde::Deserialize;
use tracing::trace;

use crate::{
    error::InferenceError,
    ports::{StreamingChunk, StreamingResponse},
};

/// One line of an Ollama chat stream
#[derive(Debug, Deserialize)]
struct OllamaStreamLine {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaStreamMessage>,
    #[serde(default)]
    done: bool,
    /// Set instead of `message` when the server aborts mid-stream
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaStreamMessage {
    #[serde(default)]
    content: String,
}

/// Incremental line decoder for NDJSON bodies
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame, returning the chunks of every line it completed
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamingChunk, InferenceError>> {
        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(chunk) = parse_line(&line[..newline]) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Parse whatever is left once the body ended without a final newline
    pub fn finish(&mut self) -> Option<Result<StreamingChunk, InferenceError>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_line(line: &[u8]) -> Option<Result<StreamingChunk, InferenceError>> {
    let text = match std::str::from_utf8(line) {
        Ok(t) => t.trim(),
        Err(e) => {
            return Some(Err(InferenceError::InvalidResponse(format!(
                "Invalid UTF-8: {e}"
            ))));
        },
    };
    if text.is_empty() {
        return None;
    }

    let parsed = match serde_json::from_str::<OllamaStreamLine>(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            return Some(Err(InferenceError::InvalidResponse(format!(
                "Failed to parse stream line: {e}"
            ))));
        },
    };
    if let Some(error) = parsed.error {
        return Some(Err(InferenceError::StreamError(error)));
    }

    trace!(done = parsed.done, "Parsed stream line");
    Some(Ok(StreamingChunk {
        content: parsed.message.map(|m| m.content).unwrap_or_default(),
        done: parsed.done,
        model: parsed.model,
    }))
}

/// Turn a streaming HTTP response into parsed chunks
pub fn create_stream(response: Response) -> StreamingResponse {
    let frames = response.bytes_stream().map(Some).chain(stream::once(future::ready(None)));

    let chunks = frames
        .scan(NdjsonDecoder::new(), |decoder, frame| {
            let parsed = match frame {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(e)) => vec![Err(InferenceError::StreamError(e.to_string()))],
                None => decoder.finish().into_iter().collect(),
            };
            future::ready(Some(parsed))
        })
        .flat_map(stream::iter);

    Box::pin(chunks)
}
