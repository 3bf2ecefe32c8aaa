use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Supported audio container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Mp4,
    Wav,
    Webm,
    Ogg,
}

impl AudioFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Mp4 => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Ogg => "audio/ogg",
        }
    }

    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Mp4 => "mp4",
            AudioFormat::Wav => "wav",
            AudioFormat::Webm => "webm",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// Detect format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        if data.starts_with(b"RIFF") && data.len() >= 12 && &data[8..12] == b"WAVE" {
            return Some(AudioFormat::Wav);
        }
        if data.starts_with(b"OggS") {
            return Some(AudioFormat::Ogg);
        }
        // ID3 tag or a bare MPEG frame sync
        if data.starts_with(b"ID3") || (data[0] == 0xFF && data[1] & 0xE0 == 0xE0) {
            return Some(AudioFormat::Mp3);
        }
        if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Some(AudioFormat::Webm);
        }
        if data.len() >= 8 && &data[4..8] == b"ftyp" {
            return Some(AudioFormat::Mp4);
        }

        None
    }
}

/// One synthesized sentence, ready to play.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    /// Position of the source sentence in enqueue order.
    pub seq: u64,
    /// The sentence that was spoken.
    pub text: String,
    pub audio: Bytes,
    pub format: AudioFormat,
}

/// Lifecycle of a streaming speech session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechState {
    /// Nothing queued, nothing in flight.
    Idle,
    /// At least one sentence is being synthesized and nothing is playing.
    Synthesizing,
    /// A unit is being played.
    Playing,
    /// Stop was requested; new sentences are refused until the guard delay elapses.
    Stopped,
}

/// Result of speech transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResult {
    pub text: String,
    /// Language code guessed from the transcript.
    pub detected_language: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_detection() {
        let wav = b"RIFF\x00\x00\x00\x00WAVEfmt ";
        assert_eq!(AudioFormat::detect(wav), Some(AudioFormat::Wav));

        let ogg = b"OggS\x00\x02";
        assert_eq!(AudioFormat::detect(ogg), Some(AudioFormat::Ogg));

        let mp3 = &[0xFF, 0xFB, 0x90, 0x00];
        assert_eq!(AudioFormat::detect(mp3), Some(AudioFormat::Mp3));

        let id3 = b"ID3\x04\x00\x00";
        assert_eq!(AudioFormat::detect(id3), Some(AudioFormat::Mp3));

        assert_eq!(AudioFormat::detect(b"hi"), None);
    }

    #[test]
    fn test_audio_format_mime_type() {
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
    }
}
