use std::path::{Path, PathBuf};

/// Fatal errors: the run stops and no output file is replaced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid json: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translation client: {0}")]
    Translate(#[from] crate::services::translation::ollama::TranslateError),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("{}: no readable pages ({unreadable} unreadable)", path.display())]
    NoPages { path: PathBuf, unreadable: usize },
}

impl Error {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reasons a single page is skipped. Never fatal for the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no article container")]
    MissingArticle,

    #[error("no headword")]
    MissingHeadword,

    #[error("no sense list")]
    MissingSenses,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reasons_are_parser_outcomes_only() {
        let reasons: Vec<String> = [
            ParseError::MissingArticle,
            ParseError::MissingHeadword,
            ParseError::MissingSenses,
        ]
        .iter()
        .map(|e| match e {
            ParseError::MissingArticle | ParseError::MissingHeadword | ParseError::MissingSenses => {
                e.to_string()
            }
        })
        .collect();

        assert_eq!(reasons, vec!["no article container", "no headword", "no sense list"]);
    }
}
