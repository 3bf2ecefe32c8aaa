//! Incremental decoder for chat-completion server-sent events.

use porter_core::{GatewayError, GatewayResult};
use serde::Deserialize;

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A non-empty content delta.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
}

#[derive(Deserialize)]
struct ChunkEnvelope {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkError {
    message: String,
}

/// Splits a byte stream into `data:` lines and decodes the JSON chunks.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> GatewayResult<Vec<SseEvent>> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&line)? {
                let done = event == SseEvent::Done;
                events.push(event);
                if done {
                    self.buffer.clear();
                    break;
                }
            }
        }
        Ok(events)
    }

    /// Decode whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self) -> GatewayResult<Option<SseEvent>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> GatewayResult<Option<SseEvent>> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| GatewayError::transport(format!("stream is not valid UTF-8: {}", e)))?
        .trim();

    // Comments, `event:` and `id:` fields carry nothing we use.
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }
    if payload == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }

    let chunk: ChunkEnvelope = serde_json::from_str(payload)
        .map_err(|e| GatewayError::transport(format!("malformed stream chunk: {}", e)))?;
    if let Some(err) = chunk.error {
        return Err(GatewayError::transport(err.message));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map(SseEvent::Delta))
}
