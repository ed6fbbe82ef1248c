use std::collections::HashSet;

use crate::model::entry::CanonicalEntry;
use crate::services::normalize::fold;

use super::hash::{expression_hash, source_hash};
use super::model::{Batch, Unit, UnitKind};

pub fn sense_key(entry_key: &str, sense: usize) -> String {
    format!("{entry_key}#sense/{sense}")
}

pub fn expression_key(entry_key: &str, sense: usize, expr: usize) -> String {
    format!("{entry_key}#expr/{sense}/{expr}")
}

pub fn pos_key(pos: &str) -> String {
    format!("pos/{}", fold(pos))
}

/// Sense glosses first, then fixed expressions, in dataset order.
pub fn units_for(entry: &CanonicalEntry) -> Vec<Unit> {
    let entry_key = entry.key().to_string();
    let mut units = Vec::new();

    for (i, sense) in entry.senses.iter().enumerate() {
        if sense.gloss.trim().is_empty() {
            continue;
        }
        units.push(Unit {
            key: sense_key(&entry_key, i),
            kind: UnitKind::Sense,
            entry: entry_key.clone(),
            headword: entry.headword.clone(),
            source: sense.gloss.clone(),
            context: None,
            hash: source_hash(&sense.gloss),
        });
    }

    for (i, sense) in entry.senses.iter().enumerate() {
        for (j, expr) in sense.fixed_expressions.iter().enumerate() {
            units.push(Unit {
                key: expression_key(&entry_key, i, j),
                kind: UnitKind::Expression,
                entry: entry_key.clone(),
                headword: entry.headword.clone(),
                source: expr.expression.clone(),
                context: Some(expr.gloss.clone()).filter(|g| !g.trim().is_empty()),
                hash: expression_hash(&expr.expression, &expr.gloss),
            });
        }
    }

    units
}

/// Every unit of the dataset: entry units, then one per distinct part-of-speech label.
pub fn collect(entries: &[CanonicalEntry]) -> Vec<Unit> {
    let mut units: Vec<Unit> = entries.iter().flat_map(units_for).collect();

    let mut seen = HashSet::new();
    for pos in entries.iter().filter_map(|e| e.pos.as_deref()) {
        let key = pos_key(pos);
        if pos.trim().is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        units.push(Unit {
            key,
            kind: UnitKind::PartOfSpeech,
            entry: "pos".to_string(),
            headword: String::new(),
            source: pos.to_string(),
            context: None,
            hash: source_hash(pos),
        });
    }

    units
}

/// Splits consecutive units of the same entry and kind into request-sized batches.
pub fn batches(units: Vec<Unit>, max_definitions: usize, max_expressions: usize) -> Vec<Batch> {
    let mut out: Vec<Batch> = Vec::new();

    for unit in units {
        let limit = match unit.kind {
            UnitKind::Sense => max_definitions,
            UnitKind::Expression => max_expressions,
            UnitKind::PartOfSpeech => usize::MAX,
        }
        .max(1);

        let joins_last = out.last().is_some_and(|b| {
            b.kind == unit.kind && b.units[0].entry == unit.entry && b.units.len() < limit
        });

        match out.last_mut() {
            Some(last) if joins_last => last.units.push(unit),
            _ => out.push(Batch {
                kind: unit.kind,
                headword: unit.headword.clone(),
                units: vec![unit],
            }),
        }
    }

    out
}
