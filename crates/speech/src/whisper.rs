//! Whisper speech-to-text client.

use async_trait::async_trait;
use bytes::Bytes;
use porter_core::config::SpeechConfig;
use porter_core::traits::Transcriber;
use porter_core::{AudioFormat, Error, Language, Result, TranscriptionResult};
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Guesses the language of a transcript from its script and a few function words.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    spanish: Regex,
    french: Regex,
}

impl LanguageDetector {
    pub fn new() -> Result<Self> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::internal(format!("bad language pattern: {}", e)))
        };
        Ok(Self {
            spanish: build(r"(?i)\b(el|la|los|las|un|una|es|está|por|para|con)\b")?,
            french: build(r"(?i)\b(le|la|les|un|une|est|dans|pour|avec|être)\b")?,
        })
    }

    /// Script checks first (Han, Arabic, Devanagari), then Spanish and
    /// French markers; English otherwise.
    pub fn detect(&self, text: &str) -> Language {
        let has = |range: std::ops::RangeInclusive<char>| text.chars().any(|c| range.contains(&c));

        if has('\u{4e00}'..='\u{9fff}') {
            Language::SimplifiedChinese
        } else if has('\u{0600}'..='\u{06ff}') {
            Language::Arabic
        } else if has('\u{0900}'..='\u{097f}') {
            Language::Hindi
        } else if self.spanish.is_match(text) {
            Language::Spanish
        } else if self.french.is_match(text) {
            Language::French
        } else {
            Language::English
        }
    }
}

/// Whisper's language code for one of ours.
fn whisper_language(language: Language) -> &'static str {
    match language {
        Language::SimplifiedChinese => "zh",
        other => other.code(),
    }
}

/// Transcriber backed by the OpenAI audio transcription endpoint.
pub struct WhisperTranscriber {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<Secret<String>>,
    detector: LanguageDetector,
}

impl WhisperTranscriber {
    pub fn new(config: &SpeechConfig, api_key: Option<Secret<String>>) -> Result<Self> {
        reqwest::Url::parse(&config.transcription_base_url).map_err(|e| {
            Error::config(format!(
                "Invalid transcription_base_url '{}': {}",
                config.transcription_base_url, e
            ))
        })?;
        let http = Client::builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.transcription_base_url.trim_end_matches('/').to_string(),
            model: config.transcription_model.clone(),
            api_key,
            detector: LanguageDetector::new()?,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: Bytes, language: Language) -> Result<TranscriptionResult> {
        if audio.is_empty() {
            return Err(Error::invalid_request("Audio file is required"));
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::config("OPENAI_API_KEY not set for Whisper transcription"))?;

        // Browsers record WebM unless told otherwise.
        let format = AudioFormat::detect(&audio).unwrap_or(AudioFormat::Webm);
        tracing::info!(
            format = ?format,
            size = audio.len(),
            language = %language,
            "Transcribing audio with Whisper"
        );

        let file = Part::bytes(audio.to_vec())
            .file_name(format!("audio.{}", format.extension()))
            .mime_str(format.mime_type())
            .map_err(|e| Error::transcription(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language", whisper_language(language));

        let resp = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::transcription(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::transcription(format!(
                "provider returned {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: WhisperResponse = resp
            .json()
            .await
            .map_err(|e| Error::transcription(format!("unreadable response: {}", e)))?;
        let detected = self.detector.detect(&parsed.text);

        Ok(TranscriptionResult {
            text: parsed.text,
            detected_language: detected.code().to_string(),
        })
    }
}
