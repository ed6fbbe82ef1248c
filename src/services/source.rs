use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::services::encoding;

/// One saved page and where it came from.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub source: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadablePage {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedPages {
    pub pages: Vec<RawPage>,
    pub unreadable: Vec<UnreadablePage>,
}

/// Reads every `*.html` file of `dir`, ordered by file name.
///
/// An unreadable directory is fatal; an unreadable file is only reported.
pub fn load_dir(dir: &Path) -> Result<LoadedPages> {
    let read = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut paths: Vec<_> = read
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")))
        .collect();
    paths.sort();

    let mut loaded = LoadedPages::default();

    for path in paths {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match fs::read(&path) {
            Ok(bytes) => {
                let page = encoding::decode(&bytes);
                if page.had_errors {
                    tracing::warn!(%source, encoding = page.encoding.name(), "page decoded with replacement characters");
                }
                loaded.pages.push(RawPage {
                    source,
                    html: page.text,
                });
            }
            Err(e) => {
                tracing::warn!(%source, "cannot read page: {e}");
                loaded.unreadable.push(UnreadablePage {
                    source,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(dir = %dir.display(), pages = loaded.pages.len(), "pages loaded");
    Ok(loaded)
}
