//! Streaming speech queue.
//!
//! Sentences go in as text and come out as audio, played strictly in enqueue
//! order. Up to `max_concurrent_synthesis` sentences are synthesized at once;
//! finished units wait in a reorder buffer until every earlier sentence has
//! been played or skipped. A single scheduler task owns both queues and the
//! playback slot, so no other component touches them.

use bytes::BytesMut;
use futures::future::{BoxFuture, Fuse, FusedFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use porter_core::config::SpeechConfig;
use porter_core::traits::{AudioSink, SpeechSynthesizer};
use porter_core::{AudioFormat, AudioUnit, Error, Language, Result, SpeechState};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::reorder::ReorderBuffer;

/// Tuning for a [`SpeechQueue`].
#[derive(Debug, Clone, Copy)]
pub struct SpeechQueueConfig {
    pub max_concurrent_synthesis: usize,
    /// How long new sentences are refused after a stop.
    pub stop_guard: Duration,
}

impl Default for SpeechQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_synthesis: 3,
            stop_guard: Duration::from_millis(100),
        }
    }
}

impl From<&SpeechConfig> for SpeechQueueConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            max_concurrent_synthesis: config.max_concurrent_synthesis.max(1),
            stop_guard: Duration::from_millis(config.stop_guard_ms),
        }
    }
}

enum Command {
    Speak {
        generation: u64,
        text: String,
        language: Language,
    },
    Stop,
    Finish(oneshot::Sender<()>),
}

/// State shared between the handles and the scheduler.
struct Shared {
    state: watch::Sender<SpeechState>,
    /// Bumped by every stop; work tagged with an older value is discarded.
    generation: AtomicU64,
    /// Cancels the unit currently playing.
    playback: Mutex<CancellationToken>,
    closed: AtomicBool,
}

impl Shared {
    fn playback_token(&self) -> CancellationToken {
        self.playback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn interrupt_playback(&self) {
        let mut token = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
    }
}

/// Handle to a running speech queue. Cheap to clone.
#[derive(Clone)]
pub struct SpeechQueue {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl SpeechQueue {
    /// Start the scheduler on the current tokio runtime.
    pub fn spawn(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        config: SpeechQueueConfig,
    ) -> Self {
        let (state, _) = watch::channel(SpeechState::Idle);
        let shared = Arc::new(Shared {
            state,
            generation: AtomicU64::new(0),
            playback: Mutex::new(CancellationToken::new()),
            closed: AtomicBool::new(false),
        });
        let (commands, rx) = mpsc::unbounded_channel();

        let scheduler = Scheduler::new(synthesizer, sink, config, shared.clone(), rx);
        tokio::spawn(scheduler.run());

        Self { shared, commands }
    }

    /// Queue one sentence for synthesis and playback.
    ///
    /// Refused while the queue is stopped (until the guard delay elapses) or
    /// after [`finish`](Self::finish).
    pub fn enqueue(&self, text: impl Into<String>, language: Language) -> Result<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Ok(());
        }
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(Error::playback("speech queue is closed"));
        }
        if *self.shared.state.borrow() == SpeechState::Stopped {
            return Err(Error::playback("speech queue is stopped"));
        }

        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.commands
            .send(Command::Speak {
                generation,
                text,
                language,
            })
            .map_err(|_| Error::playback("speech queue is closed"))
    }

    /// Stop everything now: clear both queues, cut the playing unit short and
    /// discard in-flight synthesis. Idempotent; safe with nothing queued.
    pub fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.interrupt_playback();
        let previous = self.shared.state.send_replace(SpeechState::Stopped);
        if self.commands.send(Command::Stop).is_err() {
            // Scheduler already gone; nothing would reset the state.
            self.shared.state.send_replace(previous);
        }
        tracing::debug!("Speech queue stop requested");
    }

    /// Close the input and wait until everything queued has been played.
    pub async fn finish(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Finish(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn state(&self) -> SpeechState {
        *self.shared.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SpeechState> {
        self.shared.state.subscribe()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

struct PendingSentence {
    seq: u64,
    text: String,
    language: Language,
}

struct Synthesized {
    seq: u64,
    generation: u64,
    result: Result<AudioUnit>,
}

struct Scheduler {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    config: SpeechQueueConfig,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,

    /// Generation of the last stop this scheduler has applied.
    generation: u64,
    next_seq: u64,
    pending_text: VecDeque<PendingSentence>,
    in_flight: FuturesUnordered<BoxFuture<'static, Synthesized>>,
    ready: ReorderBuffer<AudioUnit>,
    playing: Fuse<BoxFuture<'static, (u64, Result<()>)>>,
    guard_until: Option<Instant>,
    input_closed: bool,
    finish_waiters: Vec<oneshot::Sender<()>>,
}

impl Scheduler {
    fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        config: SpeechQueueConfig,
        shared: Arc<Shared>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            config,
            shared,
            commands,
            generation: 0,
            next_seq: 0,
            pending_text: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
            ready: ReorderBuffer::new(0),
            playing: Fuse::terminated(),
            guard_until: None,
            input_closed: false,
            finish_waiters: Vec::new(),
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.commands.recv(), if !self.input_closed => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => self.input_closed = true,
                },
                Some(done) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.on_synthesized(done);
                }
                (seq, result) = &mut self.playing, if !self.playing.is_terminated() => {
                    if let Err(e) = result {
                        tracing::warn!(seq, error = %e, "Playback failed");
                    }
                }
                _ = sleep_until(self.guard_until), if self.guard_until.is_some() => {
                    self.guard_until = None;
                    tracing::debug!("Speech queue ready after stop");
                }
                else => break,
            }

            self.launch_synthesis();
            self.start_playback();
            self.publish_state();

            if self.is_drained() && (self.input_closed || !self.finish_waiters.is_empty()) {
                for waiter in self.finish_waiters.drain(..) {
                    let _ = waiter.send(());
                }
                if self.input_closed || self.shared.closed.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
        self.shared.state.send_replace(SpeechState::Idle);
        tracing::debug!("Speech queue scheduler exited");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Speak {
                generation,
                text,
                language,
            } => {
                if generation != self.shared.generation.load(Ordering::SeqCst) {
                    tracing::debug!("Dropping sentence queued before stop");
                    return;
                }
                let seq = self.next_seq;
                self.next_seq += 1;
                tracing::debug!(seq, chars = text.chars().count(), "Sentence queued");
                self.pending_text.push_back(PendingSentence { seq, text, language });
            }
            Command::Stop => self.stop(),
            Command::Finish(waiter) => self.finish_waiters.push(waiter),
        }
    }

    /// A stop was requested on a handle but its command is still queued.
    fn stop_pending(&self) -> bool {
        self.generation != self.shared.generation.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.generation = self.shared.generation.load(Ordering::SeqCst);
        let discarded = self.pending_text.len() + self.in_flight.len() + self.ready.len();
        self.pending_text.clear();
        // Dropping the futures abandons the provider requests.
        self.in_flight = FuturesUnordered::new();
        self.ready.reset(self.next_seq);
        self.guard_until = Some(Instant::now() + self.config.stop_guard);
        if discarded > 0 {
            porter_governance::track_synthesis("discarded");
        }
        tracing::info!(discarded, "Speech queue stopped");
    }

    fn on_synthesized(&mut self, done: Synthesized) {
        if done.generation != self.shared.generation.load(Ordering::SeqCst) {
            porter_governance::track_synthesis("discarded");
            return;
        }
        match done.result {
            Ok(unit) => {
                porter_governance::track_synthesis("ok");
                tracing::debug!(seq = done.seq, bytes = unit.audio.len(), "Sentence synthesized");
                self.ready.insert(done.seq, Some(unit));
            }
            Err(e) => {
                // The sentence is skipped; later ones still play.
                porter_governance::track_synthesis("failed");
                tracing::warn!(seq = done.seq, error = %e, "Synthesis failed, skipping sentence");
                self.ready.insert(done.seq, None);
            }
        }
    }

    fn launch_synthesis(&mut self) {
        if self.stop_pending() {
            return;
        }
        let generation = self.generation;
        while self.in_flight.len() < self.config.max_concurrent_synthesis {
            let Some(sentence) = self.pending_text.pop_front() else {
                break;
            };
            let synthesizer = self.synthesizer.clone();
            self.in_flight.push(
                async move {
                    let seq = sentence.seq;
                    let result = synthesize_unit(synthesizer.as_ref(), sentence).await;
                    Synthesized {
                        seq,
                        generation,
                        result,
                    }
                }
                .boxed(),
            );
        }
    }

    fn start_playback(&mut self) {
        if !self.playing.is_terminated() {
            return;
        }
        // Take the token before checking for a stop: a stop that lands after
        // the check bumps the generation first and then cancels this token.
        let cancel = self.shared.playback_token();
        if self.stop_pending() {
            return;
        }
        let Some(unit) = self.ready.pop_ready() else {
            return;
        };
        let sink = self.sink.clone();
        let seq = unit.seq;
        tracing::debug!(seq, "Playing sentence");
        self.playing = async move {
            let result = sink.play(unit, &cancel).await;
            (seq, result)
        }
        .boxed()
        .fuse();
    }

    fn is_drained(&self) -> bool {
        self.pending_text.is_empty()
            && self.in_flight.is_empty()
            && self.ready.is_empty()
            && self.playing.is_terminated()
    }

    fn publish_state(&self) {
        let state = if self.guard_until.is_some() || self.stop_pending() {
            SpeechState::Stopped
        } else if !self.playing.is_terminated() {
            SpeechState::Playing
        } else if !self.pending_text.is_empty() || !self.in_flight.is_empty() || !self.ready.is_empty() {
            SpeechState::Synthesizing
        } else {
            SpeechState::Idle
        };
        self.shared.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Synthesize one sentence and assemble the streamed bytes into a unit.
async fn synthesize_unit(
    synthesizer: &dyn SpeechSynthesizer,
    sentence: PendingSentence,
) -> Result<AudioUnit> {
    let mut stream = synthesizer
        .synthesize(&sentence.text, sentence.language)
        .await?;
    let mut audio = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        audio.extend_from_slice(&chunk?);
    }
    if audio.is_empty() {
        return Err(Error::synthesis("provider returned no audio"));
    }

    let audio = audio.freeze();
    let format = AudioFormat::detect(&audio).unwrap_or(AudioFormat::Mp3);
    Ok(AudioUnit {
        seq: sentence.seq,
        text: sentence.text,
        audio,
        format,
    })
}
