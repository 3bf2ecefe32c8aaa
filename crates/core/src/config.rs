use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model_gateway: ModelGatewayConfig,
    pub pipeline: PipelineConfig,
    pub speech: SpeechConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// Include the underlying error string in 500 responses.
    #[serde(default)]
    pub expose_error_details: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelGatewayConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<Secret<String>>,
    pub request_timeout_ms: u64,
}

/// Sampling settings for one stage.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct StageSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl StageSettings {
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct HistoryWindow {
    pub analyzer: usize,
    pub streaming: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    pub context_reader: StageSettings,
    pub analyzer: StageSettings,
    pub consolidator: StageSettings,
    pub streaming: StageSettings,
    /// Hard ceiling on words in the spoken answer.
    pub response_word_limit: usize,
    pub history_window: HistoryWindow,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            context_reader: StageSettings::new(1500, 0.7),
            analyzer: StageSettings::new(1200, 0.7),
            consolidator: StageSettings::new(1200, 0.7),
            streaming: StageSettings::new(600, 0.7),
            response_word_limit: 150,
            history_window: HistoryWindow {
                analyzer: 2,
                streaming: 3,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

/// One entry of the language to voice table.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VoiceEntry {
    pub voice_id: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    pub synthesis_base_url: String,
    pub api_key: Option<Secret<String>>,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
    pub max_concurrent_synthesis: usize,
    pub stop_guard_ms: u64,
    pub transcription_base_url: String,
    pub transcription_model: String,
    /// Overrides keyed by language code (`en`, `zh-CN`, ...).
    #[serde(default)]
    pub voices: BTreeMap<String, VoiceEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("PORTER_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__SERVER__PORT=3000 to app.server.port
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mut cfg: AppConfig = s.try_deserialize()?;
        cfg.apply_key_fallbacks();
        Ok(cfg)
    }

    /// Fill missing API keys from the conventional provider variables.
    fn apply_key_fallbacks(&mut self) {
        if self.model_gateway.api_key.is_none() {
            self.model_gateway.api_key = std::env::var("OPENAI_API_KEY").ok().map(Secret::new);
        }
        if self.speech.api_key.is_none() {
            self.speech.api_key = std::env::var("ELEVENLABS_API_KEY").ok().map(Secret::new);
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 3000,
                allowed_origins: vec!["*".into()],
                expose_error_details: true,
            },
            model_gateway: ModelGatewayConfig {
                base_url: "https://api.openai.com/v1".into(),
                model: "gpt-4o".into(),
                api_key: None,
                request_timeout_ms: 60_000,
            },
            pipeline: PipelineConfig::default(),
            speech: SpeechConfig {
                synthesis_base_url: "https://api.elevenlabs.io/v1".into(),
                api_key: None,
                model_id: "eleven_multilingual_v2".into(),
                voice_settings: VoiceSettings::default(),
                max_concurrent_synthesis: 3,
                stop_guard_ms: 100,
                transcription_base_url: "https://api.openai.com/v1".into(),
                transcription_model: "whisper-1".into(),
                voices: BTreeMap::new(),
            },
            logging: LoggingConfig {
                filter: "info,porter=debug".into(),
                json: false,
            },
        }
    }
}
