use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::services::normalize::fold;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Example {
    pub text: String,

    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct FixedExpression {
    pub expression: String,

    #[serde(default)]
    pub gloss: String,

    #[serde(default)]
    pub grammar: Option<String>,

    #[serde(default)]
    pub usage: Option<String>,

    #[serde(default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Sense {
    #[serde(default)]
    pub number: Option<String>,

    #[serde(default)]
    pub gloss: String,

    #[serde(default)]
    pub grammar: Option<String>,

    #[serde(default)]
    pub examples: Vec<Example>,

    #[serde(default)]
    pub see_also: Vec<String>,

    #[serde(default)]
    pub related: Vec<String>,

    #[serde(default)]
    pub fixed_expressions: Vec<FixedExpression>,
}

/// One parsed dictionary page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RawEntry {
    #[serde(default)]
    pub headword: String,

    #[serde(default)]
    pub pos: Option<String>,

    #[serde(default)]
    pub phonetic: Option<String>,

    #[serde(default)]
    pub senses: Vec<Sense>,

    #[serde(default)]
    pub audio_urls: Vec<String>,

    #[serde(default)]
    pub wordforms: Vec<String>,

    #[serde(default)]
    pub etymology: Option<String>,

    #[serde(default)]
    pub word_formations: BTreeMap<String, Vec<String>>,

    #[serde(default, alias = "file")]
    pub source: String,
}

impl RawEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(&self.headword, self.pos.as_deref())
    }
}

/// The merged record for one (headword, part-of-speech) key.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct CanonicalEntry {
    pub headword: String,

    #[serde(default)]
    pub pos: Option<String>,

    #[serde(default)]
    pub phonetic: Option<String>,

    #[serde(default)]
    pub senses: Vec<Sense>,

    #[serde(default)]
    pub audio_urls: Vec<String>,

    #[serde(default)]
    pub wordforms: Vec<String>,

    #[serde(default)]
    pub etymology: Option<String>,

    #[serde(default)]
    pub word_formations: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub sources: Vec<String>,
}

impl CanonicalEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(&self.headword, self.pos.as_deref())
    }
}

/// Grouping key: folded headword plus folded part-of-speech.
///
/// An absent part-of-speech is its own key and never matches a present one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub headword: String,
    pub pos: Option<String>,
}

impl EntryKey {
    pub fn new(headword: &str, pos: Option<&str>) -> Self {
        let pos = pos.map(fold).filter(|p| !p.is_empty());
        EntryKey {
            headword: fold(headword),
            pos,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{}|{}", self.headword, pos),
            None => write!(f, "{}", self.headword),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_folds_case_and_whitespace() {
        let a = EntryKey::new(" Hus ", Some("Substantiv"));
        let b = EntryKey::new("hus", Some("substantiv"));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "hus|substantiv");
    }

    #[test]
    fn missing_pos_is_a_distinct_key() {
        let with_pos = EntryKey::new("hus", Some("substantiv"));
        let without = EntryKey::new("hus", None);
        let blank = EntryKey::new("hus", Some("  "));
        assert_ne!(with_pos, without);
        assert_eq!(without, blank);
        assert_eq!(without.to_string(), "hus");
    }

    #[test]
    fn raw_entry_accepts_legacy_file_field() {
        let json = r#"{ "headword": "hus", "file": "hus.html" }"#;
        let e: RawEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.source, "hus.html");
        assert!(e.senses.is_empty());
        assert_eq!(e.pos, None);
    }
}
