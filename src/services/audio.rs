//! Pronunciation audio: download once, remember where each URL was saved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_DISPOSITION, USER_AGENT};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::entry::CanonicalEntry;
use crate::services::atomic;

const TIMEOUT_SECS: u64 = 10;
const AGENT: &str = concat!("ddo-core/", env!("CARGO_PKG_VERSION"));

static DISPOSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("disposition pattern")
});

/// Audio URL -> local file.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AudioMap(pub BTreeMap<String, PathBuf>);

impl AudioMap {
    pub fn load(path: &Path) -> Result<Self> {
        atomic::read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic::write_json(path, self)
    }

    pub fn get(&self, url: &str) -> Option<&Path> {
        self.0.get(url).map(PathBuf::as_path)
    }

    pub fn insert(&mut self, url: String, path: PathBuf) {
        self.0.insert(url, path);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Local files for the entry's audio URLs, in URL order. Existence is not checked.
pub fn audio_for(entry: &CanonicalEntry, map: &AudioMap) -> Vec<PathBuf> {
    entry
        .audio_urls
        .iter()
        .filter_map(|url| map.get(url))
        .map(Path::to_path_buf)
        .collect()
}

pub struct Fetched {
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

pub trait AudioFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Fetched, String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl AudioFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Fetched, String> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, AGENT)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;

        let content_disposition = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp.bytes().map_err(|e| e.to_string())?;

        Ok(Fetched {
            content_disposition,
            bytes: bytes.to_vec(),
        })
    }
}

fn from_disposition(header: &str) -> Option<String> {
    DISPOSITION_RE
        .captures(header)
        .map(|c| c[1].trim().to_string())
        .filter(|n| !n.is_empty())
}

fn from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Header name if any, else the last URL segment; spaces become dots.
pub fn derive_filename(content_disposition: Option<&str>, url: &str) -> Option<String> {
    let raw = content_disposition
        .and_then(from_disposition)
        .or_else(|| from_url(url))?;

    // never let a header name escape the audio directory
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let name = base.replace(' ', ".");

    (!name.is_empty() && name != "." && name != "..").then_some(name)
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct AudioReport {
    pub urls: usize,
    pub already_mapped: usize,
    pub existing_files: usize,
    pub downloaded: usize,
    pub failed: usize,
}

/// Downloads every audio URL of `entries` that `map` does not know yet.
pub fn download_all(
    entries: &[CanonicalEntry],
    dir: &Path,
    map: &mut AudioMap,
    fetcher: &dyn AudioFetcher,
) -> AudioReport {
    let mut report = AudioReport::default();

    for url in entries.iter().flat_map(|e| e.audio_urls.iter()) {
        report.urls += 1;

        if map.get(url).is_some() {
            report.already_mapped += 1;
            continue;
        }

        let fetched = match fetcher.fetch(url) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(%url, "audio download failed: {e}");
                report.failed += 1;
                continue;
            }
        };

        let Some(name) = derive_filename(fetched.content_disposition.as_deref(), url) else {
            tracing::warn!(%url, "cannot derive a file name");
            report.failed += 1;
            continue;
        };
        let local = dir.join(name);

        if local.exists() {
            tracing::debug!(%url, path = %local.display(), "file exists, mapping without download");
            map.insert(url.clone(), local);
            report.existing_files += 1;
            continue;
        }

        match atomic::write_atomic(&local, &fetched.bytes) {
            Ok(()) => {
                tracing::debug!(%url, path = %local.display(), "audio downloaded");
                map.insert(url.clone(), local);
                report.downloaded += 1;
            }
            Err(e) => {
                tracing::warn!(%url, "cannot save audio: {e}");
                report.failed += 1;
            }
        }
    }

    report
}

/// Loads dataset and map, downloads what is missing and saves the map.
pub fn run(dataset_path: &Path, dir: &Path, map_path: &Path) -> Result<AudioReport> {
    let entries = crate::services::dataset::load(dataset_path)?;
    let mut map = AudioMap::load(map_path)?;
    let fetcher = HttpFetcher::new()?;

    let report = download_all(&entries, dir, &mut map, &fetcher);
    map.save(map_path)?;

    tracing::info!(
        urls = report.urls,
        downloaded = report.downloaded,
        existing = report.existing_files,
        failed = report.failed,
        mapped = map.len(),
        "audio finished"
    );

    Ok(report)
}
