use std::path::Path;

use crate::error::{Error, Result};
use crate::model::settings::Settings;
use crate::services::atomic;

pub const DEFAULT_SETTINGS_FILE: &str = "ddo.json";

/// Loads the settings file.
///
/// A missing default file means defaults; a file named explicitly must exist.
/// `OLLAMA_HOST` overrides the endpoint either way.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let mut settings: Settings = match path {
        Some(p) => {
            if !p.exists() {
                return Err(Error::Settings(format!("{} does not exist", p.display())));
            }
            atomic::read_json(p)?
        }
        None => atomic::read_json_or_default(Path::new(DEFAULT_SETTINGS_FILE))?,
    };

    apply_env(&mut settings, std::env::var("OLLAMA_HOST").ok());
    validate(&settings)?;

    Ok(settings)
}

fn apply_env(settings: &mut Settings, ollama_host: Option<String>) {
    if let Some(host) = ollama_host.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) {
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("http://{host}")
        };
        tracing::debug!(endpoint = %host, "endpoint taken from OLLAMA_HOST");
        settings.translation.endpoint = host;
    }
}

fn validate(settings: &Settings) -> Result<()> {
    let t = &settings.translation;

    if t.max_retries == 0 {
        return Err(Error::Settings("translation.max_retries must be at least 1".into()));
    }
    if t.max_definitions_per_batch == 0 || t.max_expressions_per_batch == 0 {
        return Err(Error::Settings("batch sizes must be at least 1".into()));
    }
    if t.save_every == 0 {
        return Err(Error::Settings("translation.save_every must be at least 1".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddo.json");
        fs::write(
            &path,
            r#"{ "html_dir": "pages", "translation": { "target_lang": "Deutsch", "max_retries": 2 } }"#,
        )
        .unwrap();

        let s: Settings = atomic::read_json(&path).unwrap();

        assert_eq!(s.html_dir, Path::new("pages"));
        assert_eq!(s.dataset, Path::new("ddo_entries_unique.json"));
        assert_eq!(s.translation.target_language, "Deutsch");
        assert_eq!(s.translation.max_retries, 2);
        assert_eq!(s.translation.max_definitions_per_batch, 30);
        assert_eq!(s.translation.store_path(), Path::new("translations_deutsch.json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn invalid_json_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddo.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
    }

    #[test]
    fn ollama_host_gets_a_scheme() {
        let mut s = Settings::default();
        apply_env(&mut s, Some("10.0.0.5:11434".to_string()));
        assert_eq!(s.translation.endpoint, "http://10.0.0.5:11434");

        apply_env(&mut s, Some("  ".to_string()));
        assert_eq!(s.translation.endpoint, "http://10.0.0.5:11434");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut s = Settings::default();
        s.translation.max_expressions_per_batch = 0;
        assert!(matches!(validate(&s), Err(Error::Settings(_))));
    }
}
