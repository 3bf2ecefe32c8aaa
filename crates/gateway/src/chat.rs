//! Chat endpoints: multi-stage answers, streamed text and spoken answers.

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use porter_core::policy::tables::greeting;
use porter_core::{AudioUnit, Language, TextStream, UserRole};
use porter_speech::{ChannelSink, SentenceSegmenter, SpeechQueue};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::api::{ApiError, ChatRequest, DetailedChatResponse, StreamEvent};
use crate::server::AppState;

const DETAILED_DEFAULT_LANGUAGE: &str = "English";
const DETAILED_DEFAULT_ROLE: &str = "middle_management";
const STREAM_DEFAULT_LANGUAGE: &str = "en";
const STREAM_DEFAULT_ROLE: &str = "frontline_operations";

/// Buffered NDJSON lines between the producer task and the response body.
const EVENT_BUFFER: usize = 64;
/// Synthesized units waiting to be forwarded to the client.
const AUDIO_BUFFER: usize = 4;

/// `POST /api/chat-detailed`: run the full pipeline.
pub(crate) async fn detailed_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<DetailedChatResponse>, ApiError> {
    let ctx = req
        .into_context(DETAILED_DEFAULT_LANGUAGE, DETAILED_DEFAULT_ROLE)
        .map_err(|e| ApiError::from_error(&e, "Invalid request", false))?;

    tracing::info!(language = %ctx.language, role = %ctx.user_role, "Detailed chat request");

    let response = state.orchestrator.run(&ctx).await.map_err(|e| {
        ApiError::from_error(
            &e,
            "Failed to process detailed chat message",
            state.expose_error_details,
        )
    })?;

    Ok(Json(DetailedChatResponse {
        success: true,
        response,
    }))
}

/// `GET /api/chat-detailed`: describe how to call the endpoint.
pub(crate) async fn detailed_usage_handler() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Send a POST request with a message to receive a multi-stage answer",
        "greeting": greeting(Language::English),
        "usage": {
            "method": "POST",
            "body": {
                "message": "string (required)",
                "language": "string (optional, default English)",
                "userRole": "string (optional, default middle_management)",
                "dashboardData": "object (optional)",
                "conversationHistory": "array (optional)",
                "screenshotUrl": "string (optional)"
            }
        },
        "supportedLanguages": Language::ALL.iter().map(|l| l.code()).collect::<Vec<_>>(),
        "supportedRoles": UserRole::ALL.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}

async fn open_stream(
    state: &AppState,
    req: ChatRequest,
) -> Result<(Language, TextStream), ApiError> {
    let ctx = req
        .into_context(STREAM_DEFAULT_LANGUAGE, STREAM_DEFAULT_ROLE)
        .map_err(|e| ApiError::from_error(&e, "Invalid request", false))?;

    tracing::info!(language = %ctx.language, role = %ctx.user_role, "Streaming chat request");

    let tokens = state.orchestrator.stream(&ctx).await.map_err(|e| {
        ApiError::from_error(&e, "Failed to process chat message", state.expose_error_details)
    })?;
    Ok((ctx.language, tokens))
}

fn event_stream(body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// `POST /api/chat`: stream the answer as NDJSON text events.
pub(crate) async fn stream_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let (_, tokens) = open_stream(&state, req).await?;

    let mut failed = false;
    let lines = tokens
        .take_while(move |item| {
            let keep = !failed;
            failed |= item.is_err();
            futures::future::ready(keep)
        })
        .filter_map(|item| {
            futures::future::ready(match item {
                Ok(chunk) if chunk.is_empty() => None,
                Ok(chunk) => Some(StreamEvent::text(chunk).to_line()),
                Err(e) => {
                    tracing::error!(error = %e, "Answer stream failed");
                    Some(StreamEvent::error("Stream interrupted").to_line())
                }
            })
        })
        .map(Ok::<_, Infallible>);

    Ok(event_stream(Body::from_stream(lines)))
}

/// `POST /api/chat/raw`: stream the answer as plain text chunks.
pub(crate) async fn raw_stream_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let (_, tokens) = open_stream(&state, req).await?;
    let chunks = tokens.map(|item| item.map(Bytes::from));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}

/// `POST /api/chat/spoken`: stream the answer and speak it sentence by sentence.
///
/// Text events are forwarded as they arrive; audio events follow in sentence
/// order as each unit is released by the speech queue; `done` comes last.
pub(crate) async fn spoken_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let (language, tokens) = open_stream(&state, req).await?;

    let (sink, audio) = ChannelSink::channel(AUDIO_BUFFER);
    let queue = SpeechQueue::spawn(
        state.synthesizer.clone(),
        Arc::new(sink),
        state.speech,
    );
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(drive_spoken_answer(tokens, queue, audio, language, tx));

    let lines = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Ok(event_stream(Body::from_stream(lines)))
}

async fn drive_spoken_answer(
    mut tokens: TextStream,
    queue: SpeechQueue,
    mut audio: mpsc::Receiver<AudioUnit>,
    language: Language,
    tx: mpsc::Sender<String>,
) {
    let mut segmenter = SentenceSegmenter::new();
    let mut tokens_done = false;

    loop {
        tokio::select! {
            _ = tx.closed() => {
                tracing::info!("Client disconnected, stopping speech");
                queue.stop();
                return;
            }
            item = tokens.next(), if !tokens_done => match item {
                Some(Ok(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    for sentence in segmenter.push(&chunk) {
                        speak(&queue, sentence, language);
                    }
                    if tx.send(StreamEvent::text(chunk).to_line()).await.is_err() {
                        queue.stop();
                        return;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Answer stream failed");
                    queue.stop();
                    let _ = tx.send(StreamEvent::error("Stream interrupted").to_line()).await;
                    return;
                }
                None => {
                    tokens_done = true;
                    if let Some(rest) = segmenter.finish() {
                        speak(&queue, rest, language);
                    }
                    // The sink closes once the drained scheduler exits.
                    let closing = queue.clone();
                    tokio::spawn(async move { closing.finish().await });
                }
            },
            unit = audio.recv() => match unit {
                Some(unit) => {
                    if tx.send(StreamEvent::audio(&unit).to_line()).await.is_err() {
                        queue.stop();
                        return;
                    }
                }
                None => break,
            },
        }
    }

    let _ = tx.send(StreamEvent::Done.to_line()).await;
}

fn speak(queue: &SpeechQueue, sentence: String, language: Language) {
    if let Err(e) = queue.enqueue(sentence, language) {
        tracing::debug!(error = %e, "Sentence not queued");
    }
}
