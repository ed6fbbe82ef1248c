use super::model::{TranslationRecord, Unit};

/// Record for `unit` made from the same source text. `records` must be sorted by key.
pub fn exact_match<'a>(records: &'a [TranslationRecord], unit: &Unit) -> Option<&'a TranslationRecord> {
    let idx = records
        .binary_search_by(|r| r.key.as_str().cmp(unit.key.as_str()))
        .ok()?;
    let record = &records[idx];

    (record.hash == unit.hash).then_some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::translation::hash::source_hash;
    use crate::services::translation::model::UnitKind;

    fn unit(key: &str, source: &str) -> Unit {
        Unit {
            key: key.to_string(),
            kind: UnitKind::Sense,
            entry: "hus|substantiv".to_string(),
            headword: "hus".to_string(),
            source: source.to_string(),
            context: None,
            hash: source_hash(source),
        }
    }

    fn record(key: &str, source: &str, gloss: &str) -> TranslationRecord {
        TranslationRecord {
            key: key.to_string(),
            source: source.to_string(),
            hash: source_hash(source),
            lemma: String::new(),
            gloss: gloss.to_string(),
        }
    }

    #[test]
    fn matches_on_key_and_hash() {
        let records = vec![
            record("hus|substantiv#sense/0", "bygning", "building"),
            record("hus|substantiv#sense/1", "husstand", "household"),
        ];

        let hit = exact_match(&records, &unit("hus|substantiv#sense/1", "husstand"));
        assert_eq!(hit.map(|r| r.gloss.as_str()), Some("household"));

        assert!(exact_match(&records, &unit("hus|substantiv#sense/1", "familie")).is_none());
        assert!(exact_match(&records, &unit("hus|substantiv#sense/7", "husstand")).is_none());
    }
}
