//! Mock implementations of core traits for testing.
//!
//! Scripted doubles for the model gateway and the speech collaborators, shared
//! by the unit and integration tests of every crate.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{GatewayError, GatewayResult},
    traits::{
        AudioSink, AudioStream, CompletionRequest, LlmClient, LlmResponse, LlmUsage,
        SpeechSynthesizer, TextStream, Transcriber,
    },
    types::{AudioUnit, Language, TranscriptionResult},
    Error, Result,
};

// =============================================================================
// Scripted LLM
// =============================================================================

/// One scripted gateway answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Buffered text (also streamed as a single fragment).
    Text(String),
    /// Streamed fragments (joined for buffered calls).
    Fragments(Vec<String>),
    Fail(GatewayError),
}

impl ScriptedReply {
    pub fn text(s: impl Into<String>) -> Self {
        ScriptedReply::Text(s.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        ScriptedReply::Text(value.to_string())
    }

    pub fn fragments<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedReply::Fragments(parts.into_iter().map(Into::into).collect())
    }
}

/// Scripted mock LLM that answers from a queue and records every request.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ScriptedReply>>,
    /// Answer used once the queue is empty.
    repeat: Option<ScriptedReply>,
    requests: Mutex<Vec<CompletionRequest>>,
    fragment_delay: Duration,
}

impl ScriptedLlm {
    /// Create a mock that answers with `replies` in order.
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
            fragment_delay: Duration::ZERO,
        }
    }

    /// Create a mock that always gives the same answer.
    pub fn repeating(reply: ScriptedReply) -> Self {
        Self {
            repeat: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    /// Sleep between streamed fragments.
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    /// Number of gateway calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests received, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, request: &CompletionRequest) -> ScriptedReply {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .unwrap_or_else(|| {
                ScriptedReply::Fail(GatewayError::transport("mock script exhausted"))
            })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<LlmResponse> {
        let content = match self.next_reply(request) {
            ScriptedReply::Text(text) => text,
            ScriptedReply::Fragments(parts) => parts.concat(),
            ScriptedReply::Fail(err) => return Err(err),
        };

        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        })
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> GatewayResult<TextStream> {
        let parts = match self.next_reply(request) {
            ScriptedReply::Text(text) => vec![text],
            ScriptedReply::Fragments(parts) => parts,
            ScriptedReply::Fail(err) => return Err(err),
        };
        let delay = self.fragment_delay;

        let fragments = stream::iter(parts).then(move |part| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(part)
        });
        Ok(Box::pin(fragments))
    }
}

// =============================================================================
// Mock Speech Synthesizer
// =============================================================================

/// Synthesizer with per-sentence latency that tracks its own concurrency.
#[derive(Default)]
pub struct MockSynthesizer {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            ..Self::default()
        }
    }

    /// Override the latency for one sentence.
    pub fn with_delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    /// Make synthesis of `text` fail.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Highest number of simultaneous synthesize calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Sentences whose synthesis started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Sentences whose synthesis finished, in completion order.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    /// The bytes produced for `text`.
    pub fn audio_for(text: &str) -> Bytes {
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(text.as_bytes());
        Bytes::from(audio)
    }
}

struct InFlightSlot<'a>(&'a AtomicUsize);

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _language: Language) -> Result<AudioStream> {
        self.started.lock().unwrap().push(text.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Dropped futures (stop) must still release their slot.
        let _slot = InFlightSlot(&self.in_flight);

        let delay = self.delays.get(text).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.completed.lock().unwrap().push(text.to_string());

        if self.failing.contains(text) {
            return Err(Error::synthesis(format!("mock failure for '{}'", text)));
        }

        // Two chunks, so callers have to assemble the unit.
        let audio = Self::audio_for(text);
        let (head, tail) = audio.split_at(3);
        let chunks = vec![
            Ok(Bytes::copy_from_slice(head)),
            Ok(Bytes::copy_from_slice(tail)),
        ];
        Ok(Box::pin(stream::iter(chunks)))
    }
}

// =============================================================================
// Recording Audio Sink
// =============================================================================

/// Sink that records what was played and checks that playback is serial.
#[derive(Default)]
pub struct RecordingSink {
    play_time: Duration,
    playing: AtomicUsize,
    overlaps: AtomicUsize,
    played: Mutex<Vec<AudioUnit>>,
    interrupted: Mutex<Vec<u64>>,
}

impl RecordingSink {
    pub fn new(play_time: Duration) -> Self {
        Self {
            play_time,
            ..Self::default()
        }
    }

    /// Units played to completion, in playback order.
    pub fn played(&self) -> Vec<AudioUnit> {
        self.played.lock().unwrap().clone()
    }

    pub fn played_texts(&self) -> Vec<String> {
        self.played().into_iter().map(|u| u.text).collect()
    }

    /// Sequence numbers of units cut short by cancellation.
    pub fn interrupted(&self) -> Vec<u64> {
        self.interrupted.lock().unwrap().clone()
    }

    /// Times a unit started while another was still playing.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, unit: AudioUnit, cancel: &CancellationToken) -> Result<()> {
        if self.playing.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        let finished = tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.play_time) => true,
        };

        self.playing.fetch_sub(1, Ordering::SeqCst);
        if finished {
            self.played.lock().unwrap().push(unit);
        } else {
            self.interrupted.lock().unwrap().push(unit.seq);
        }
        Ok(())
    }
}

// =============================================================================
// Mock Transcriber
// =============================================================================

/// Transcriber that returns a fixed transcript.
pub struct MockTranscriber {
    text: String,
    calls: Mutex<Vec<(usize, Language)>>,
}

impl MockTranscriber {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (audio length, language) of each call.
    pub fn calls(&self) -> Vec<(usize, Language)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, audio: Bytes, language: Language) -> Result<TranscriptionResult> {
        if audio.is_empty() {
            return Err(Error::transcription("empty audio"));
        }
        self.calls.lock().unwrap().push((audio.len(), language));
        Ok(TranscriptionResult {
            text: self.text.clone(),
            detected_language: language.code().to_string(),
        })
    }
}
