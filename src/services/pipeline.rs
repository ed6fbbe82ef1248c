use std::path::Path;

use crate::error::{Error, Result};
use crate::model::entry::{CanonicalEntry, RawEntry};
use crate::parsers;
use crate::services::normalize::normalize_entry;
use crate::services::resolve::{self, ResolveReport};
use crate::services::source::{self, RawPage};
use crate::services::{dataset, qa};

pub struct BuildConfig<'a> {
    pub html_dir: &'a Path,
    pub raw_out: Option<&'a Path>,
    pub dataset: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedPage {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct BuildReport {
    pub pages: usize,
    pub parsed: usize,
    pub skipped: Vec<SkippedPage>,
    pub resolve: ResolveReport,
    pub qa_issues: usize,
}

#[derive(Debug)]
pub struct BuildOutput {
    pub raw: Vec<RawEntry>,
    pub entries: Vec<CanonicalEntry>,
    pub report: BuildReport,
}

/// Parses every page; pages that fail are reported, not fatal.
pub fn parse_pages(pages: &[RawPage]) -> (Vec<RawEntry>, Vec<SkippedPage>) {
    let mut parsed = Vec::with_capacity(pages.len());
    let mut skipped = Vec::new();

    for page in pages {
        match parsers::ddo::parse(&page.html, &page.source) {
            Ok(entry) => parsed.push(entry),
            Err(e) => {
                tracing::warn!(source = %page.source, "skipping page: {e}");
                skipped.push(SkippedPage {
                    source: page.source.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (parsed, skipped)
}

/// Normalize + resolve.
pub fn dedupe(raw: Vec<RawEntry>) -> resolve::Resolution {
    resolve::resolve(raw.into_iter().map(normalize_entry))
}

/// Pure part of a build: no file system access.
pub fn build(pages: &[RawPage]) -> BuildOutput {
    let (raw, skipped) = parse_pages(pages);
    let parsed = raw.len();

    let resolution = dedupe(raw.clone());

    for c in &resolution.report.conflicts {
        tracing::debug!(
            key = %c.key,
            field = c.field,
            kept = %c.kept,
            discarded = %c.discarded,
            source = %c.source,
            "merge conflict"
        );
    }

    let issues = qa::run(&resolution.entries);
    for issue in &issues {
        tracing::debug!(key = %issue.key, code = %issue.code, "{}", issue.message);
    }

    BuildOutput {
        raw,
        entries: resolution.entries,
        report: BuildReport {
            pages: pages.len(),
            parsed,
            skipped,
            resolve: resolution.report,
            qa_issues: issues.len(),
        },
    }
}

/// Loads, builds and writes the dataset, then the optional raw dump.
///
/// A directory without a single readable page is fatal and leaves the
/// existing dataset in place.
pub fn run(cfg: BuildConfig) -> Result<BuildReport> {
    let loaded = source::load_dir(cfg.html_dir)?;
    if loaded.pages.is_empty() {
        return Err(Error::NoPages {
            path: cfg.html_dir.to_path_buf(),
            unreadable: loaded.unreadable.len(),
        });
    }

    let mut output = build(&loaded.pages);

    let unreadable = loaded.unreadable.into_iter().map(|u| SkippedPage {
        source: u.source,
        reason: u.reason,
    });
    output.report.pages += unreadable.len();
    output.report.skipped.extend(unreadable);

    dataset::write(cfg.dataset, &output.entries)?;
    if let Some(raw_out) = cfg.raw_out {
        dataset::write_raw(raw_out, &output.raw)?;
    }

    let r = &output.report;
    tracing::info!(
        pages = r.pages,
        parsed = r.parsed,
        skipped = r.skipped.len(),
        dropped = r.resolve.dropped_missing_headword,
        merged = r.resolve.merged_duplicates,
        conflicts = r.resolve.conflicts.len(),
        entries = r.resolve.groups,
        qa_issues = r.qa_issues,
        "build finished"
    );

    Ok(output.report)
}

pub fn run_dedupe(input: &Path, output: &Path) -> Result<ResolveReport> {
    let raw = dataset::load_raw(input)?;
    let resolution = dedupe(raw);

    dataset::write(output, &resolution.entries)?;

    let r = &resolution.report;
    tracing::info!(
        input = r.input,
        dropped = r.dropped_missing_headword,
        merged = r.merged_duplicates,
        entries = r.groups,
        "dedupe finished"
    );

    Ok(resolution.report)
}
