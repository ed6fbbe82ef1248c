use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_html_dir() -> PathBuf {
    PathBuf::from("ddo_html")
}

fn default_dataset() -> PathBuf {
    PathBuf::from("ddo_entries_unique.json")
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}

fn default_audio_map() -> PathBuf {
    PathBuf::from("audio_map.json")
}

fn default_enriched() -> PathBuf {
    PathBuf::from("ddo_entries_enriched.json")
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "gemma3:12b".to_string()
}

fn default_target_lang() -> String {
    "English".to_string()
}

fn default_max_retries() -> usize {
    10
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_definitions_per_batch() -> usize {
    30
}

fn default_expressions_per_batch() -> usize {
    20
}

fn default_save_every() -> usize {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_html_dir")]
    pub html_dir: PathBuf,

    /// Optional dump of the parsed entries before deduplication.
    #[serde(default)]
    pub raw_entries: Option<PathBuf>,

    #[serde(default = "default_dataset", alias = "output")]
    pub dataset: PathBuf,

    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    #[serde(default = "default_audio_map")]
    pub audio_map: PathBuf,

    #[serde(default = "default_enriched")]
    pub enriched: PathBuf,

    #[serde(default)]
    pub translation: TranslationSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_target_lang", alias = "target_lang")]
    pub target_language: String,

    /// Defaults to `translations_<target_language>.json` in the working directory,
    /// like the other default paths.
    #[serde(default)]
    pub store: Option<PathBuf>,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_definitions_per_batch")]
    pub max_definitions_per_batch: usize,

    #[serde(default = "default_expressions_per_batch")]
    pub max_expressions_per_batch: usize,

    #[serde(default = "default_save_every")]
    pub save_every: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            html_dir: default_html_dir(),
            raw_entries: None,
            dataset: default_dataset(),
            audio_dir: default_audio_dir(),
            audio_map: default_audio_map(),
            enriched: default_enriched(),
            translation: TranslationSettings::default(),
        }
    }
}

impl Default for TranslationSettings {
    fn default() -> Self {
        TranslationSettings {
            endpoint: default_endpoint(),
            model: default_model(),
            target_language: default_target_lang(),
            store: None,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_definitions_per_batch: default_definitions_per_batch(),
            max_expressions_per_batch: default_expressions_per_batch(),
            save_every: default_save_every(),
        }
    }
}

impl TranslationSettings {
    pub fn store_path(&self) -> PathBuf {
        match &self.store {
            Some(p) => p.clone(),
            None => {
                let lang: String = self
                    .target_language
                    .trim()
                    .to_lowercase()
                    .chars()
                    .map(|c| if c.is_alphanumeric() { c } else { '_' })
                    .collect();
                PathBuf::from(format!("translations_{lang}.json"))
            }
        }
    }
}
