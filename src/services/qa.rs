use serde::{Deserialize, Serialize};

use crate::model::entry::CanonicalEntry;

#[derive(Debug, Serialize, Deserialize)]
pub struct QaIssue {
    pub key: String,
    pub code: String,
    pub message: String,
}

pub fn run(entries: &[CanonicalEntry]) -> Vec<QaIssue> {
    let mut issues: Vec<QaIssue> = Vec::new();

    for e in entries {
        let key = e.key().to_string();

        if e.senses.is_empty() {
            issues.push(QaIssue {
                key: key.clone(),
                code: "NO_SENSES".to_string(),
                message: "Entry has no senses".to_string(),
            });
        }

        // A sense that only carries fixed expressions legitimately has no gloss
        for (i, s) in e.senses.iter().enumerate() {
            if s.gloss.trim().is_empty() && s.fixed_expressions.is_empty() {
                issues.push(QaIssue {
                    key: key.clone(),
                    code: "EMPTY_GLOSS".to_string(),
                    message: format!("Sense {} has no gloss", i + 1),
                });
            }

            for expr in &s.fixed_expressions {
                if expr.gloss.trim().is_empty() {
                    issues.push(QaIssue {
                        key: key.clone(),
                        code: "EXPRESSION_WITHOUT_GLOSS".to_string(),
                        message: format!("Fixed expression '{}' has no gloss", expr.expression),
                    });
                }
            }
        }

        if e.phonetic.is_none() {
            issues.push(QaIssue {
                key,
                code: "NO_PHONETIC".to_string(),
                message: "Entry has no phonetic transcription".to_string(),
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::{FixedExpression, Sense};

    #[test]
    fn reports_each_problem_once() {
        let entries = vec![
            CanonicalEntry {
                headword: "hus".to_string(),
                phonetic: Some("[ˈhuːˀs]".to_string()),
                senses: vec![
                    Sense {
                        gloss: "bygning".to_string(),
                        ..Default::default()
                    },
                    Sense::default(),
                    Sense {
                        fixed_expressions: vec![FixedExpression {
                            expression: "holde hus".to_string(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            CanonicalEntry {
                headword: "kat".to_string(),
                pos: Some("substantiv".to_string()),
                ..Default::default()
            },
        ];

        let issues = run(&entries);
        let codes: Vec<(&str, &str)> = issues
            .iter()
            .map(|i| (i.key.as_str(), i.code.as_str()))
            .collect();

        assert_eq!(
            codes,
            vec![
                ("hus", "EMPTY_GLOSS"),
                ("hus", "EXPRESSION_WITHOUT_GLOSS"),
                ("kat|substantiv", "NO_SENSES"),
                ("kat|substantiv", "NO_PHONETIC"),
            ]
        );
        assert_eq!(issues[0].message, "Sense 2 has no gloss");
    }
}
