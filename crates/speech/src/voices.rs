//! Language to voice mapping for speech synthesis.

use porter_core::config::VoiceEntry;
use porter_core::Language;
use std::collections::{BTreeMap, HashMap};

/// Voice used for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
}

/// Language → voice table, with English as the fallback entry.
#[derive(Debug, Clone)]
pub struct VoiceTable {
    voices: HashMap<Language, Voice>,
    fallback: Voice,
}

impl VoiceTable {
    /// Apply overrides keyed by language code or name on top of the defaults.
    ///
    /// Unknown keys are skipped with a warning.
    pub fn with_overrides(overrides: &BTreeMap<String, VoiceEntry>) -> Self {
        let mut table = Self::default();
        for (key, entry) in overrides {
            match key.parse::<Language>() {
                Ok(language) => {
                    table.voices.insert(
                        language,
                        Voice {
                            voice_id: entry.voice_id.clone(),
                            name: entry.name.clone(),
                        },
                    );
                }
                Err(_) => tracing::warn!(key = %key, "Ignoring voice override for unknown language"),
            }
        }
        if let Some(english) = table.voices.get(&Language::English) {
            table.fallback = english.clone();
        }
        table
    }

    pub fn voice_for(&self, language: Language) -> &Voice {
        self.voices.get(&language).unwrap_or(&self.fallback)
    }
}

const DEFAULT_VOICES: [(Language, &str, &str); 6] = [
    (Language::English, "aFxDLa1A1dSRlzW8nziT", "Lim"),
    (Language::SimplifiedChinese, "fQj4gJSexpu8RDE2Ii5m", "Yu"),
    (Language::Spanish, "5IDdqnXnlsZ1FCxoOFYg", "Jesus"),
    (Language::Arabic, "LXrTqFIgiubkrMkwvOUr", "Masry"),
    (Language::French, "kENkNtk0xyzG09WW40xE", "Marcel"),
    (Language::Hindi, "bUTE2M5LdnqaUCd5tJB3", "Vihan"),
];

impl Default for VoiceTable {
    fn default() -> Self {
        let voices: HashMap<Language, Voice> = DEFAULT_VOICES
            .iter()
            .map(|(language, id, name)| {
                (
                    *language,
                    Voice {
                        voice_id: id.to_string(),
                        name: name.to_string(),
                    },
                )
            })
            .collect();
        let (_, id, name) = DEFAULT_VOICES[0];
        Self {
            voices,
            fallback: Voice {
                voice_id: id.to_string(),
                name: name.to_string(),
            },
        }
    }
}
