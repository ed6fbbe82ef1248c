//! Groups normalized records by (headword, part-of-speech) and merges each group
//! into one canonical entry.
//!
//! The scan is a fold over an explicit [`Accumulator`]: groups live in an
//! append-order vector, and the hash index only maps a key to its position, so
//! output order is the order in which keys were first seen.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::entry::{CanonicalEntry, EntryKey, Example, FixedExpression, RawEntry, Sense};
use crate::services::normalize::fold;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeConflict {
    pub key: String,
    pub field: &'static str,
    pub kept: String,
    pub discarded: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    pub input: usize,
    pub dropped_missing_headword: usize,
    pub groups: usize,
    pub merged_duplicates: usize,
    pub conflicts: Vec<MergeConflict>,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub entries: Vec<CanonicalEntry>,
    pub report: ResolveReport,
}

#[derive(Debug, Default)]
struct Accumulator {
    index: HashMap<EntryKey, usize>,
    groups: Vec<CanonicalEntry>,
    report: ResolveReport,
}

impl Accumulator {
    fn absorb(mut self, entry: RawEntry) -> Self {
        self.report.input += 1;

        if entry.headword.trim().is_empty() {
            tracing::warn!(source = %entry.source, "dropping record without headword");
            self.report.dropped_missing_headword += 1;
            return self;
        }

        let key = entry.key();
        match self.index.get(&key) {
            Some(&pos) => {
                let conflicts = merge_into(&mut self.groups[pos], entry, &key);
                self.report.conflicts.extend(conflicts);
                self.report.merged_duplicates += 1;
            }
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push(start_group(entry));
            }
        }

        self
    }

    fn finish(mut self) -> Resolution {
        self.report.groups = self.groups.len();
        Resolution {
            entries: self.groups,
            report: self.report,
        }
    }
}

/// Merges every record sharing a key. Records without a headword are dropped and counted.
pub fn resolve(entries: impl IntoIterator<Item = RawEntry>) -> Resolution {
    entries
        .into_iter()
        .fold(Accumulator::default(), Accumulator::absorb)
        .finish()
}

fn start_group(entry: RawEntry) -> CanonicalEntry {
    let mut canonical = CanonicalEntry {
        headword: entry.headword.clone(),
        pos: entry.pos.clone(),
        sources: Vec::new(),
        ..Default::default()
    };
    let key = entry.key();
    // a fresh group cannot conflict with itself
    let _ = merge_into(&mut canonical, entry, &key);
    canonical
}

fn merge_into(target: &mut CanonicalEntry, entry: RawEntry, key: &EntryKey) -> Vec<MergeConflict> {
    let mut conflicts = Vec::new();
    let key_str = key.to_string();

    if let Some(c) = first_wins(&mut target.phonetic, entry.phonetic, "phonetic") {
        conflicts.push(c.into_conflict(&key_str, &entry.source));
    }
    if let Some(c) = first_wins(&mut target.etymology, entry.etymology, "etymology") {
        conflicts.push(c.into_conflict(&key_str, &entry.source));
    }

    for mut sense in entry.senses {
        let expressions = std::mem::take(&mut sense.fixed_expressions);
        let idx = merge_sense(&mut target.senses, sense);
        // expressions belong to the article; one copy per entry, whichever sense holds it
        for expr in expressions {
            let expr_key = fold(&expr.expression);
            let home = target
                .senses
                .iter()
                .position(|s| s.fixed_expressions.iter().any(|e| fold(&e.expression) == expr_key))
                .unwrap_or(idx);
            merge_expression(&mut target.senses[home].fixed_expressions, expr);
        }
    }

    union_strings(&mut target.audio_urls, entry.audio_urls);
    union_strings(&mut target.wordforms, entry.wordforms);

    for (category, items) in entry.word_formations {
        union_strings(target.word_formations.entry(category).or_default(), items);
    }

    target.sources.push(entry.source);

    conflicts
}

struct Discarded {
    field: &'static str,
    kept: String,
    discarded: String,
}

impl Discarded {
    fn into_conflict(self, key: &str, source: &str) -> MergeConflict {
        MergeConflict {
            key: key.to_string(),
            field: self.field,
            kept: self.kept,
            discarded: self.discarded,
            source: source.to_string(),
        }
    }
}

/// Keeps the first non-empty value; reports a differing later one.
fn first_wins(slot: &mut Option<String>, incoming: Option<String>, field: &'static str) -> Option<Discarded> {
    let incoming = incoming.filter(|v| !v.trim().is_empty())?;

    match slot {
        None => {
            *slot = Some(incoming);
            None
        }
        Some(kept) if fold(kept) == fold(&incoming) => None,
        Some(kept) => Some(Discarded {
            field,
            kept: kept.clone(),
            discarded: incoming,
        }),
    }
}

fn fill_if_empty(slot: &mut Option<String>, incoming: Option<String>) {
    if slot.is_none() {
        *slot = incoming.filter(|v| !v.trim().is_empty());
    }
}

/// Merges `incoming` (without its expressions) into the sense with the same
/// folded gloss, or appends it. Returns the index of the sense it ended up in.
fn merge_sense(senses: &mut Vec<Sense>, incoming: Sense) -> usize {
    let gloss_key = fold(&incoming.gloss);

    let Some(idx) = senses.iter().position(|s| fold(&s.gloss) == gloss_key) else {
        let mut fresh = Sense {
            examples: Vec::new(),
            see_also: Vec::new(),
            related: Vec::new(),
            fixed_expressions: Vec::new(),
            ..incoming.clone()
        };
        union_examples(&mut fresh.examples, incoming.examples);
        union_strings(&mut fresh.see_also, incoming.see_also);
        union_strings(&mut fresh.related, incoming.related);
        senses.push(fresh);
        return senses.len() - 1;
    };

    let existing = &mut senses[idx];
    fill_if_empty(&mut existing.number, incoming.number);
    fill_if_empty(&mut existing.grammar, incoming.grammar);
    union_examples(&mut existing.examples, incoming.examples);
    union_strings(&mut existing.see_also, incoming.see_also);
    union_strings(&mut existing.related, incoming.related);
    idx
}

fn merge_expression(exprs: &mut Vec<FixedExpression>, incoming: FixedExpression) {
    let key = fold(&incoming.expression);

    let Some(existing) = exprs.iter_mut().find(|e| fold(&e.expression) == key) else {
        let mut fresh = FixedExpression {
            examples: Vec::new(),
            ..incoming.clone()
        };
        union_examples(&mut fresh.examples, incoming.examples);
        exprs.push(fresh);
        return;
    };

    if existing.gloss.trim().is_empty() {
        existing.gloss = incoming.gloss;
    }
    fill_if_empty(&mut existing.grammar, incoming.grammar);
    fill_if_empty(&mut existing.usage, incoming.usage);
    union_examples(&mut existing.examples, incoming.examples);
}

/// Appends examples whose folded text is new; first-seen order.
fn union_examples(target: &mut Vec<Example>, incoming: Vec<Example>) {
    for ex in incoming {
        let key = fold(&ex.text);
        if key.is_empty() {
            continue;
        }
        match target.iter_mut().find(|t| fold(&t.text) == key) {
            Some(existing) => fill_if_empty(&mut existing.source, ex.source),
            None => target.push(ex),
        }
    }
}

fn union_strings(target: &mut Vec<String>, incoming: Vec<String>) {
    for item in incoming {
        let key = fold(&item);
        if key.is_empty() {
            continue;
        }
        if !target.iter().any(|t| fold(t) == key) {
            target.push(item);
        }
    }
}
