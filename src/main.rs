use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ddo_core::model::settings::Settings;
use ddo_core::services::{audio, join, pipeline, settings, translation};

#[derive(Parser)]
#[command(name = "ddo-core")]
#[command(about = "Build a deduplicated Den Danske Ordbog dataset from saved article pages")]
struct Cli {
    /// Settings file (default: ddo.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "ddo_core=trace"; RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, normalize, deduplicate and write the dataset
    Build {
        #[arg(long)]
        html_dir: Option<PathBuf>,

        /// Also write the parsed entries before deduplication
        #[arg(long)]
        raw_out: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Deduplicate a JSON array of parsed entries
    Dedupe {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Download pronunciation audio and update the URL map
    Audio {
        #[arg(long)]
        dataset: Option<PathBuf>,

        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long)]
        map: Option<PathBuf>,
    },

    /// Translate units that have no stored translation yet
    Translate {
        #[arg(long)]
        dataset: Option<PathBuf>,

        #[arg(long)]
        target_lang: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Write the enriched dataset
    Join {
        #[arg(long)]
        dataset: Option<PathBuf>,

        #[arg(long)]
        store: Option<PathBuf>,

        #[arg(long)]
        map: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let mut cfg: Settings = settings::load(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Command::Build {
            html_dir,
            raw_out,
            out,
        } => {
            let html_dir = html_dir.unwrap_or(cfg.html_dir);
            let raw_out = raw_out.or(cfg.raw_entries);
            let out = out.unwrap_or(cfg.dataset);

            let report = pipeline::run(pipeline::BuildConfig {
                html_dir: &html_dir,
                raw_out: raw_out.as_deref(),
                dataset: &out,
            })
            .with_context(|| format!("building {}", out.display()))?;

            println!(
                "{} pages, {} parsed, {} skipped, {} merged, {} conflicts -> {} entries in {}",
                report.pages,
                report.parsed,
                report.skipped.len(),
                report.resolve.merged_duplicates,
                report.resolve.conflicts.len(),
                report.resolve.groups,
                out.display()
            );
        }

        Command::Dedupe { input, out } => {
            let out = out.unwrap_or(cfg.dataset);
            let report = pipeline::run_dedupe(&input, &out)
                .with_context(|| format!("deduplicating {}", input.display()))?;

            println!(
                "{} records, {} without headword, {} merged -> {} entries in {}",
                report.input,
                report.dropped_missing_headword,
                report.merged_duplicates,
                report.groups,
                out.display()
            );
        }

        Command::Audio { dataset, dir, map } => {
            let dataset = dataset.unwrap_or(cfg.dataset);
            let dir = dir.unwrap_or(cfg.audio_dir);
            let map = map.unwrap_or(cfg.audio_map);

            let report = audio::run(&dataset, &dir, &map).context("downloading audio")?;

            println!(
                "{} urls, {} downloaded, {} already present, {} failed -> {}",
                report.urls,
                report.downloaded,
                report.already_mapped + report.existing_files,
                report.failed,
                map.display()
            );
        }

        Command::Translate {
            dataset,
            target_lang,
            model,
            store,
        } => {
            let dataset = dataset.unwrap_or(cfg.dataset);
            if let Some(lang) = target_lang {
                cfg.translation.target_language = lang;
            }
            if let Some(model) = model {
                cfg.translation.model = model;
            }
            if store.is_some() {
                cfg.translation.store = store;
            }

            let report = translation::run(&dataset, &cfg.translation).context("translating")?;

            println!(
                "{} pending, {} translated, {} failed batches -> {}",
                report.pending,
                report.translated,
                report.failed_batches,
                cfg.translation.store_path().display()
            );
        }

        Command::Join {
            dataset,
            store,
            map,
            out,
        } => {
            let dataset = dataset.unwrap_or(cfg.dataset);
            let store = store.unwrap_or_else(|| cfg.translation.store_path());
            let map = map.unwrap_or(cfg.audio_map);
            let out = out.unwrap_or(cfg.enriched);

            let report = join::run(&dataset, &store, &map, &out).context("joining")?;

            println!(
                "{} entries, {} with audio, {} translations -> {}",
                report.entries,
                report.with_audio,
                report.translations,
                out.display()
            );
        }
    }

    Ok(())
}
