use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::entry::CanonicalEntry;
use crate::services::audio::{self, AudioMap};
use crate::services::translation::model::Translation;
use crate::services::translation::store::TranslationStore;
use crate::services::translation::units;
use crate::services::{atomic, dataset};

/// Canonical entry plus its local audio and matching translations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrichedEntry {
    pub key: String,
    pub entry: CanonicalEntry,
    #[serde(default)]
    pub audio: Vec<PathBuf>,
    /// Unit key -> translation; only units whose source text is unchanged.
    #[serde(default)]
    pub translations: BTreeMap<String, Translation>,
}

pub fn join(entries: &[CanonicalEntry], store: &TranslationStore, map: &AudioMap) -> Vec<EnrichedEntry> {
    entries
        .iter()
        .map(|entry| {
            let mut translations = BTreeMap::new();

            // the entry's own units plus its part-of-speech label
            for unit in units::collect(std::slice::from_ref(entry)) {
                if let Some(record) = store.lookup(&unit) {
                    translations.insert(
                        unit.key,
                        Translation {
                            lemma: record.lemma.clone(),
                            gloss: record.gloss.clone(),
                        },
                    );
                }
            }

            EnrichedEntry {
                key: entry.key().to_string(),
                entry: entry.clone(),
                audio: audio::audio_for(entry, map),
                translations,
            }
        })
        .collect()
}

#[derive(Debug, Default, Serialize)]
pub struct JoinReport {
    pub entries: usize,
    pub with_audio: usize,
    pub translations: usize,
}

pub fn run(dataset_path: &Path, store_path: &Path, map_path: &Path, out: &Path) -> Result<JoinReport> {
    let entries = dataset::load(dataset_path)?;
    let store = TranslationStore::load(store_path)?;
    let map = AudioMap::load(map_path)?;

    let enriched = join(&entries, &store, &map);
    atomic::write_json(out, &enriched)?;

    let report = JoinReport {
        entries: enriched.len(),
        with_audio: enriched.iter().filter(|e| !e.audio.is_empty()).count(),
        translations: enriched.iter().map(|e| e.translations.len()).sum(),
    };
    tracing::info!(
        path = %out.display(),
        entries = report.entries,
        with_audio = report.with_audio,
        translations = report.translations,
        "enriched dataset written"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::Sense;
    use crate::services::translation::hash::source_hash;
    use crate::services::translation::model::TranslationRecord;

    fn record(key: &str, source: &str, lemma: &str, gloss: &str) -> TranslationRecord {
        TranslationRecord {
            key: key.to_string(),
            source: source.to_string(),
            hash: source_hash(source),
            lemma: lemma.to_string(),
            gloss: gloss.to_string(),
        }
    }

    #[test]
    fn joins_matching_translations_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TranslationStore::load(&dir.path().join("t.json")).unwrap();
        store.insert(record("hus|substantiv#sense/0", "bygning", "house", "building"));
        // made from an older text of the second sense
        store.insert(record("hus|substantiv#sense/1", "familie", "family", "family"));
        store.insert(record("pos/substantiv", "substantiv", "noun", "noun"));

        let mut map = AudioMap::default();
        map.insert("https://a.dk/hus.mp3".to_string(), PathBuf::from("audio/hus.mp3"));

        let entries = vec![CanonicalEntry {
            headword: "hus".to_string(),
            pos: Some("substantiv".to_string()),
            senses: vec![
                Sense {
                    gloss: "bygning".to_string(),
                    ..Default::default()
                },
                Sense {
                    gloss: "husstand".to_string(),
                    ..Default::default()
                },
            ],
            audio_urls: vec!["https://a.dk/hus.mp3".to_string(), "https://a.dk/other.mp3".to_string()],
            ..Default::default()
        }];

        let out = join(&entries, &store, &map);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "hus|substantiv");
        assert_eq!(out[0].audio, vec![PathBuf::from("audio/hus.mp3")]);
        let keys: Vec<&str> = out[0].translations.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["hus|substantiv#sense/0", "pos/substantiv"]);
        assert_eq!(out[0].translations["hus|substantiv#sense/0"].lemma, "house");
    }
}
