//! Language-model translations of definitions, fixed expressions and
//! part-of-speech labels, stored by stable unit keys.

pub mod hash;
pub mod matcher;
pub mod model;
pub mod ollama;
pub mod store;
pub mod units;

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::model::entry::CanonicalEntry;
use crate::model::settings::TranslationSettings;
use crate::services::dataset;

use self::ollama::{OllamaTranslator, Translator};
use self::store::TranslationStore;

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct TranslateReport {
    pub pending: usize,
    pub translated: usize,
    pub failed_batches: usize,
}

/// Translates every unit the store does not hold yet.
///
/// Failed batches are skipped; the store is saved every `save_every` successful
/// batches and once at the end.
pub fn translate_pending(
    entries: &[CanonicalEntry],
    store: &mut TranslationStore,
    translator: &dyn Translator,
    cfg: &TranslationSettings,
) -> Result<TranslateReport> {
    let pending: Vec<_> = units::collect(entries)
        .into_iter()
        .filter(|u| store.is_pending(u))
        .collect();

    let mut report = TranslateReport {
        pending: pending.len(),
        ..Default::default()
    };

    let batches = units::batches(pending, cfg.max_definitions_per_batch, cfg.max_expressions_per_batch);
    let total = batches.len();
    tracing::info!(units = report.pending, batches = total, "translating pending units");

    let mut unsaved = 0usize;

    for (n, batch) in batches.iter().enumerate() {
        match translator.translate(batch) {
            Ok(translations) => {
                for (unit, t) in batch.units.iter().zip(translations) {
                    store.insert(unit.record(t));
                    report.translated += 1;
                }
                unsaved += 1;
                tracing::debug!(batch = n + 1, total, headword = %batch.headword, "batch translated");
            }
            Err(e) => {
                report.failed_batches += 1;
                tracing::error!(batch = n + 1, total, headword = %batch.headword, "batch failed: {e}");
            }
        }

        if unsaved >= cfg.save_every.max(1) {
            store.save()?;
            unsaved = 0;
        }
    }

    store.save()?;

    Ok(report)
}

/// Loads the dataset and the store, then translates with the configured Ollama model.
pub fn run(dataset_path: &Path, cfg: &TranslationSettings) -> Result<TranslateReport> {
    let entries = dataset::load(dataset_path)?;
    let mut store = TranslationStore::load(&cfg.store_path())?;
    let translator = OllamaTranslator::new(cfg)?;

    tracing::info!(
        endpoint = %cfg.endpoint,
        model = %cfg.model,
        target = %cfg.target_language,
        store = %store.path().display(),
        "starting translation"
    );

    let report = translate_pending(&entries, &mut store, &translator, cfg)?;

    tracing::info!(
        pending = report.pending,
        translated = report.translated,
        failed_batches = report.failed_batches,
        "translation finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{FixedExpression, Sense};
    use crate::services::translation::model::{Batch, Translation};
    use crate::services::translation::ollama::TranslateError;
    use std::cell::RefCell;

    /// Echoes the source text back, upper-cased; fails for headwords in `fail`.
    #[derive(Default)]
    struct FakeTranslator {
        fail: Vec<&'static str>,
        calls: RefCell<Vec<usize>>,
    }

    impl Translator for FakeTranslator {
        fn translate(&self, batch: &Batch) -> std::result::Result<Vec<Translation>, TranslateError> {
            self.calls.borrow_mut().push(batch.units.len());
            if self.fail.contains(&batch.headword.as_str()) {
                return Err(TranslateError::Reply("refused".into()));
            }
            Ok(batch
                .units
                .iter()
                .map(|u| Translation {
                    lemma: batch.headword.to_uppercase(),
                    gloss: u.source.to_uppercase(),
                })
                .collect())
        }
    }

    fn entries() -> Vec<CanonicalEntry> {
        vec![
            CanonicalEntry {
                headword: "hus".to_string(),
                pos: Some("substantiv".to_string()),
                senses: vec![
                    Sense {
                        gloss: "bygning".to_string(),
                        fixed_expressions: vec![FixedExpression {
                            expression: "holde hus".to_string(),
                            gloss: "være sparsommelig".to_string(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                    Sense {
                        gloss: "husstand".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            CanonicalEntry {
                headword: "kat".to_string(),
                pos: Some("substantiv".to_string()),
                senses: vec![Sense {
                    gloss: "dyr".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        ]
    }

    #[test]
    fn second_run_has_nothing_pending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        let cfg = TranslationSettings::default();
        let fake = FakeTranslator::default();

        let mut store = TranslationStore::load(&path).unwrap();
        let first = translate_pending(&entries(), &mut store, &fake, &cfg).unwrap();
        assert_eq!(
            first,
            TranslateReport {
                pending: 5,
                translated: 5,
                failed_batches: 0
            }
        );
        // hus senses, hus expressions, kat senses, pos labels
        assert_eq!(*fake.calls.borrow(), vec![2, 1, 1, 1]);

        let mut reloaded = TranslationStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 5);
        let second = translate_pending(&entries(), &mut reloaded, &fake, &cfg).unwrap();
        assert_eq!(second, TranslateReport::default());
    }

    #[test]
    fn edited_gloss_is_translated_again() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TranslationSettings::default();
        let fake = FakeTranslator::default();
        let mut store = TranslationStore::load(&dir.path().join("t.json")).unwrap();
        translate_pending(&entries(), &mut store, &fake, &cfg).unwrap();

        let mut edited = entries();
        edited[1].senses[0].gloss = "lille dyr".to_string();
        let report = translate_pending(&edited, &mut store, &fake, &cfg).unwrap();

        assert_eq!(report.pending, 1);
        let record = store
            .records()
            .iter()
            .find(|r| r.key == "kat|substantiv#sense/0")
            .unwrap();
        assert_eq!(record.gloss, "LILLE DYR");
    }

    #[test]
    fn edited_expression_meaning_is_translated_again() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TranslationSettings::default();
        let fake = FakeTranslator::default();
        let mut store = TranslationStore::load(&dir.path().join("t.json")).unwrap();
        translate_pending(&entries(), &mut store, &fake, &cfg).unwrap();

        let mut edited = entries();
        edited[0].senses[0].fixed_expressions[0].gloss = "styre en husholdning".to_string();
        let report = translate_pending(&edited, &mut store, &fake, &cfg).unwrap();

        assert_eq!(report.pending, 1);
        assert_eq!(report.translated, 1);
    }

    #[test]
    fn failed_batches_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        let cfg = TranslationSettings::default();
        let fake = FakeTranslator {
            fail: vec!["kat"],
            ..Default::default()
        };

        let mut store = TranslationStore::load(&path).unwrap();
        let report = translate_pending(&entries(), &mut store, &fake, &cfg).unwrap();

        assert_eq!(report.pending, 5);
        assert_eq!(report.translated, 4);
        assert_eq!(report.failed_batches, 1);
        assert!(path.exists());
        assert_eq!(TranslationStore::load(&path).unwrap().len(), 4);
    }
}
