use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::services::atomic;

use super::hash::source_hash;
use super::matcher;
use super::model::{TranslationRecord, Unit};

/// Translations on disk, deduplicated and sorted by key.
#[derive(Debug)]
pub struct TranslationStore {
    path: PathBuf,
    records: Vec<TranslationRecord>,
}

impl TranslationStore {
    /// Loads `path`; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let mut entries: Vec<TranslationRecord> = atomic::read_json_or_default(path)?;

        let mut migrated = 0usize;
        for e in entries.iter_mut() {
            if ensure_hash(e) {
                migrated += 1;
            }
        }

        let (mut records, removed) = dedup(entries);
        sort_records(&mut records);

        if migrated > 0 || removed > 0 {
            tracing::info!(path = %path.display(), migrated, removed, "translation store cleaned up");
        }

        Ok(TranslationStore {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[TranslationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lookup(&self, unit: &Unit) -> Option<&TranslationRecord> {
        matcher::exact_match(&self.records, unit)
    }

    pub fn is_pending(&self, unit: &Unit) -> bool {
        self.lookup(unit).is_none()
    }

    /// Adds or replaces the record with the same key.
    pub fn insert(&mut self, record: TranslationRecord) {
        match self
            .records
            .binary_search_by(|r| r.key.as_str().cmp(record.key.as_str()))
        {
            Ok(idx) => self.records[idx] = record,
            Err(idx) => self.records.insert(idx, record),
        }
    }

    pub fn save(&self) -> Result<()> {
        atomic::write_json(&self.path, &self.records)?;
        tracing::debug!(path = %self.path.display(), records = self.records.len(), "translation store saved");
        Ok(())
    }
}

fn ensure_hash(e: &mut TranslationRecord) -> bool {
    if e.hash.is_empty() {
        e.hash = source_hash(&e.source);
        return true;
    }
    false
}

fn dedup(entries: Vec<TranslationRecord>) -> (Vec<TranslationRecord>, usize) {
    let mut map: HashMap<String, TranslationRecord> = HashMap::new();
    let mut removed = 0usize;

    for e in entries {
        match map.get_mut(&e.key) {
            None => {
                map.insert(e.key.clone(), e);
            }
            Some(existing) => {
                if pick_better(existing, &e) {
                    *existing = e;
                }
                removed += 1;
            }
        }
    }

    (map.into_values().collect(), removed)
}

fn pick_better(current: &TranslationRecord, candidate: &TranslationRecord) -> bool {
    let cur_empty = current.gloss.trim().is_empty();
    let cand_empty = candidate.gloss.trim().is_empty();

    if cur_empty && !cand_empty {
        return true;
    }
    if !cur_empty && cand_empty {
        return false;
    }

    candidate.gloss.len() > current.gloss.len()
}

fn sort_records(records: &mut [TranslationRecord]) {
    records.sort_by(|a, b| a.key.cmp(&b.key));
}
