use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::entry::{Example, FixedExpression, RawEntry, Sense};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("tag pattern"));

static TRAILING_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s*\d+)+$").expect("digits pattern"));

/// Canonical display form of a text: markup removed, whitespace collapsed, NFC.
pub fn clean_text(text: &str) -> String {
    let mut s = text.to_string();

    // "<<b>>" only disappears after two passes
    while TAG_RE.is_match(&s) {
        s = TAG_RE.replace_all(&s, " ").into_owned();
    }

    let s: String = s
        .chars()
        .filter_map(|c| match c {
            '\u{a0}' => Some(' '),
            '\u{ad}' | '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}' | '\u{feff}' => None,
            c => Some(c),
        })
        .collect();

    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");

    s.nfc().collect()
}

/// Headword display form; drops homograph numbers ("hus1" -> "hus", "hus 1 2" -> "hus").
pub fn clean_headword(text: &str) -> String {
    let s = clean_text(text);
    let stripped = TRAILING_DIGITS_RE.replace(&s, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        s
    } else {
        stripped.to_string()
    }
}

/// Comparison form used for keys, glosses and examples.
pub fn fold(text: &str) -> String {
    clean_text(text).to_lowercase()
}

/// Looser comparison form for translation hashes: quotes and brackets do not count.
pub fn match_text(text: &str) -> String {
    let mut s = fold(text);

    for ch in ['“', '”', '’', '‘', '…', '"', '\'', '(', ')'] {
        s = s.replace(ch, "");
    }

    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .iter()
        .map(|s| clean_text(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn normalize_examples(examples: Vec<Example>) -> Vec<Example> {
    examples
        .into_iter()
        .map(|ex| Example {
            text: clean_text(&ex.text),
            source: clean_optional(ex.source),
        })
        .filter(|ex| !ex.text.is_empty())
        .collect()
}

fn normalize_expression(expr: FixedExpression) -> FixedExpression {
    FixedExpression {
        expression: clean_text(&expr.expression),
        gloss: clean_text(&expr.gloss),
        grammar: clean_optional(expr.grammar),
        usage: clean_optional(expr.usage),
        examples: normalize_examples(expr.examples),
    }
}

fn normalize_sense(sense: Sense) -> Sense {
    Sense {
        number: clean_optional(sense.number),
        gloss: clean_text(&sense.gloss),
        grammar: clean_optional(sense.grammar),
        examples: normalize_examples(sense.examples),
        see_also: clean_list(sense.see_also),
        related: clean_list(sense.related),
        fixed_expressions: sense
            .fixed_expressions
            .into_iter()
            .map(normalize_expression)
            .filter(|e| !e.expression.is_empty())
            .collect(),
    }
}

/// Canonicalizes every text field of a record. Idempotent.
pub fn normalize_entry(entry: RawEntry) -> RawEntry {
    let mut word_formations: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (category, items) in entry.word_formations {
        let category = clean_text(&category);
        if category.is_empty() {
            continue;
        }
        word_formations
            .entry(category)
            .or_default()
            .extend(clean_list(items));
    }

    RawEntry {
        headword: clean_headword(&entry.headword),
        pos: clean_optional(entry.pos),
        phonetic: clean_optional(entry.phonetic),
        senses: entry.senses.into_iter().map(normalize_sense).collect(),
        audio_urls: clean_list(entry.audio_urls),
        wordforms: clean_list(entry.wordforms),
        etymology: clean_optional(entry.etymology),
        word_formations,
        source: entry.source,
    }
}
