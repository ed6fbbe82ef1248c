use sha2::{Digest, Sha256};

use crate::services::normalize::match_text;

pub fn hash_norm(norm: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(norm.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Hash of the comparison form of `text`; quoting and spacing changes keep it stable.
pub fn source_hash(text: &str) -> String {
    hash_norm(&match_text(text))
}

/// Hash of a fixed expression together with its Danish meaning.
pub fn expression_hash(expression: &str, gloss: &str) -> String {
    hash_norm(&format!("{}\n{}", match_text(expression), match_text(gloss)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmetic_changes_keep_the_hash() {
        assert_eq!(
            source_hash("bygning der er beregnet til beboelse"),
            source_hash("  Bygning  der er \"beregnet\" til beboelse")
        );
        assert_ne!(source_hash("bygning"), source_hash("bolig"));
        assert_eq!(source_hash("").len(), 64);
    }

    #[test]
    fn expression_hash_covers_the_meaning() {
        let base = expression_hash("holde hus", "være sparsommelig");
        assert_eq!(base, expression_hash("Holde  hus", "være sparsommelig"));
        assert_ne!(base, expression_hash("holde hus", "styre en husholdning"));
        assert_ne!(base, source_hash("holde hus"));
    }
}
