use std::path::Path;

use crate::error::Result;
use crate::model::entry::{CanonicalEntry, RawEntry};
use crate::services::atomic;

/// Serialized form of the dataset. Field order follows the struct declarations and
/// maps are sorted, so identical input gives identical bytes.
pub fn render(entries: &[CanonicalEntry]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(entries)?;
    json.push('\n');
    Ok(json)
}

pub fn write(path: &Path, entries: &[CanonicalEntry]) -> Result<()> {
    let json = render(entries)?;
    atomic::write_atomic(path, json.as_bytes())?;
    tracing::info!(path = %path.display(), entries = entries.len(), "dataset written");
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<CanonicalEntry>> {
    let entries: Vec<CanonicalEntry> = atomic::read_json(path)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "dataset loaded");
    Ok(entries)
}

pub fn write_raw(path: &Path, entries: &[RawEntry]) -> Result<()> {
    atomic::write_json(path, entries)?;
    tracing::info!(path = %path.display(), entries = entries.len(), "raw entries written");
    Ok(())
}

pub fn load_raw(path: &Path) -> Result<Vec<RawEntry>> {
    atomic::read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{Example, Sense};

    fn sample() -> Vec<CanonicalEntry> {
        let mut e = CanonicalEntry {
            headword: "hus".to_string(),
            pos: Some("substantiv".to_string()),
            phonetic: Some("[ˈhuːˀs]".to_string()),
            senses: vec![Sense {
                gloss: "bygning".to_string(),
                examples: vec![Example {
                    text: "et stort hus".to_string(),
                    source: None,
                }],
                ..Default::default()
            }],
            sources: vec!["hus.html".to_string()],
            ..Default::default()
        };
        e.word_formations
            .insert("Sammensætninger".to_string(), vec!["husdyr".to_string()]);
        e.word_formations
            .insert("Afledninger".to_string(), vec!["huslig".to_string()]);
        vec![e]
    }

    #[test]
    fn render_is_stable_and_ordered() {
        let a = render(&sample()).unwrap();
        let b = render(&sample()).unwrap();
        assert_eq!(a, b);

        let headword = a.find("\"headword\"").unwrap();
        let pos = a.find("\"pos\"").unwrap();
        let sources = a.find("\"sources\"").unwrap();
        assert!(headword < pos && pos < sources);

        let afl = a.find("Afledninger").unwrap();
        let sam = a.find("Sammensætninger").unwrap();
        assert!(afl < sam);
        // non-ASCII stays readable
        assert!(a.contains("ˈhuːˀs"));
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("ddo_entries_unique.json");

        write(&path, &sample()).unwrap();
        write(&path, &sample()).unwrap();

        assert_eq!(load(&path).unwrap(), sample());
    }
}
