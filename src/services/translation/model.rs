use serde::{Deserialize, Serialize};

/// One stored translation. `hash` is the hash of the source text it was made from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TranslationRecord {
    pub key: String,
    pub source: String,

    #[serde(default)]
    pub hash: String,

    #[serde(default)]
    pub lemma: String,

    #[serde(default)]
    pub gloss: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    #[serde(default)]
    pub lemma: String,

    #[serde(default)]
    pub gloss: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Sense,
    Expression,
    PartOfSpeech,
}

/// One translatable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub key: String,
    pub kind: UnitKind,
    /// Display key of the owning entry; `pos` for part-of-speech labels.
    pub entry: String,
    pub headword: String,
    pub source: String,
    /// Danish meaning of a fixed expression, sent along as context.
    pub context: Option<String>,
    pub hash: String,
}

impl Unit {
    pub fn record(&self, translation: Translation) -> TranslationRecord {
        TranslationRecord {
            key: self.key.clone(),
            source: self.source.clone(),
            hash: self.hash.clone(),
            lemma: translation.lemma,
            gloss: translation.gloss,
        }
    }
}

/// Units of one entry and kind, sent in one request.
#[derive(Debug, Clone)]
pub struct Batch {
    pub kind: UnitKind,
    pub headword: String,
    pub units: Vec<Unit>,
}
