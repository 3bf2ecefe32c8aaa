//! Voice endpoints: one-shot synthesis and transcription.

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use porter_core::{Error, Language, TranscriptionResult};
use std::sync::Arc;

use crate::api::{ApiError, SpeakRequest, TranscribeParams};
use crate::server::AppState;

const DEFAULT_LANGUAGE: &str = "en";

fn parse_language(raw: Option<&str>) -> Result<Language, ApiError> {
    raw.unwrap_or(DEFAULT_LANGUAGE)
        .parse()
        .map_err(|e: Error| ApiError::from_error(&e, "Invalid request", false))
}

/// `POST /api/voice/speak`: synthesize `text` and stream the audio back.
pub(crate) async fn speak_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpeakRequest>,
) -> Result<Response, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("Text is required"));
    }
    let language = parse_language(req.language.as_deref())?;

    let audio = state
        .synthesizer
        .synthesize(&req.text, language)
        .await
        .map_err(|e| {
            ApiError::from_error(&e, "Failed to synthesize speech", state.expose_error_details)
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(audio),
    )
        .into_response())
}

/// `POST /api/voice/transcribe`: transcribe the raw audio body.
pub(crate) async fn transcribe_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TranscribeParams>,
    audio: Bytes,
) -> Result<Json<TranscriptionResult>, ApiError> {
    if audio.is_empty() {
        return Err(ApiError::bad_request("Audio file is required"));
    }
    let language = parse_language(params.language.as_deref())?;

    tracing::info!(bytes = audio.len(), language = %language, "Transcription request");

    let result = state
        .transcriber
        .transcribe(audio, language)
        .await
        .map_err(|e| {
            ApiError::from_error(&e, "Failed to transcribe audio", state.expose_error_details)
        })?;
    Ok(Json(result))
}
