use std::{thread, time::Duration};

use rand::{thread_rng, Rng};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

use crate::model::settings::TranslationSettings;

use super::model::{Batch, Translation, UnitKind};

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid reply: {0}")]
    Reply(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: String },
}

/// Turns one batch into one translation per unit, in unit order.
pub trait Translator {
    fn translate(&self, batch: &Batch) -> Result<Vec<Translation>, TranslateError>;
}

pub struct OllamaTranslator {
    client: Client,
    endpoint: String,
    model: String,
    target_lang: String,
    max_retries: usize,
    base_delay_ms: u64,
}

impl OllamaTranslator {
    pub fn new(cfg: &TranslationSettings) -> Result<Self, TranslateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(OllamaTranslator {
            client,
            endpoint: format!("{}/api/chat", cfg.endpoint.trim_end_matches('/')),
            model: cfg.model.clone(),
            target_lang: cfg.target_language.clone(),
            max_retries: cfg.max_retries.max(1),
            base_delay_ms: cfg.base_delay_ms,
        })
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let jitter: u64 = thread_rng().gen_range(0..500);
        let factor = 2_u64.pow(attempt.min(6) as u32);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor) + jitter)
    }

    fn request(&self, prompt: &str) -> Result<String, TranslateError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "stream": false,
            "format": "json",
            "options": { "temperature": 0.2 }
        });

        let resp = self.client.post(&self.endpoint).json(&body).send()?;
        let status = resp.status();
        let text = resp.text()?;

        if !status.is_success() {
            return Err(TranslateError::Status {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }

        let v: Value = serde_json::from_str(&text)
            .map_err(|e| TranslateError::Reply(format!("response is not JSON: {e}")))?;

        v.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| TranslateError::Reply("missing message.content".into()))
    }
}

impl Translator for OllamaTranslator {
    fn translate(&self, batch: &Batch) -> Result<Vec<Translation>, TranslateError> {
        let mut feedback: Option<String> = None;

        for attempt in 0..self.max_retries {
            let prompt = build_prompt(batch, &self.target_lang, feedback.as_deref());

            let err = match self.request(&prompt) {
                Ok(content) => match parse_reply(&content, batch) {
                    Ok(translations) => return Ok(translations),
                    Err(e) => e,
                },
                Err(TranslateError::Status { status, message })
                    if !should_retry_http(status) =>
                {
                    return Err(TranslateError::Status { status, message });
                }
                Err(e) => e,
            };

            tracing::warn!(
                headword = %batch.headword,
                attempt = attempt + 1,
                max = self.max_retries,
                "translation attempt failed: {err}"
            );
            feedback = Some(err.to_string());

            if attempt + 1 < self.max_retries {
                thread::sleep(self.backoff(attempt));
            }
        }

        Err(TranslateError::Exhausted {
            attempts: self.max_retries,
            last: feedback.unwrap_or_default(),
        })
    }
}

const SYSTEM_PROMPT: &str =
    "You are a lexicographer translating entries of a Danish dictionary. Reply with JSON only.";

fn should_retry_http(status: u16) -> bool {
    StatusCode::from_u16(status).is_ok_and(|s| {
        s == StatusCode::REQUEST_TIMEOUT || s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
    })
}

fn extract_error_message(body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v.get("error").and_then(|e| e.as_str()) {
            return msg.to_string();
        }
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
    }

    let trimmed = body_text.trim();
    match trimmed.char_indices().nth(400) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

pub fn build_prompt(batch: &Batch, target_lang: &str, feedback: Option<&str>) -> String {
    let mut p = String::new();

    match batch.kind {
        UnitKind::Sense => {
            p.push_str(&format!(
                "Translate the numbered Danish definitions of the word \"{}\" into {target_lang}.\n",
                batch.headword
            ));
            p.push_str(&format!(
                "For each number give \"lemma\": the {target_lang} word for \"{}\" in that sense, \
                 and \"gloss\": the translated definition.\n",
                batch.headword
            ));
        }
        UnitKind::Expression => {
            p.push_str(&format!(
                "Translate the numbered Danish fixed expressions containing \"{}\" into {target_lang}.\n",
                batch.headword
            ));
            p.push_str(
                "For each number give \"lemma\": an equivalent expression, \
                 and \"gloss\": the translated meaning.\n",
            );
        }
        UnitKind::PartOfSpeech => {
            p.push_str(&format!(
                "Translate the numbered Danish grammatical labels into {target_lang}.\n"
            ));
            p.push_str("For each number give \"lemma\": the translated label, and \"gloss\": the same.\n");
        }
    }

    p.push_str("Answer as {\"1\": {\"lemma\": \"...\", \"gloss\": \"...\"}, ...} with exactly the numbers below.\n\n");

    for (i, unit) in batch.units.iter().enumerate() {
        match &unit.context {
            Some(ctx) => p.push_str(&format!("{}. {} ({ctx})\n", i + 1, unit.source)),
            None => p.push_str(&format!("{}. {}\n", i + 1, unit.source)),
        }
    }

    if let Some(fb) = feedback {
        p.push_str(&format!("\nYour previous answer was rejected: {fb}\n"));
    }

    p
}

fn strip_fences(content: &str) -> &str {
    let s = content.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop the language tag line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Accepts `{"1": {...}}`, `{"1": "text"}` or a list, optionally wrapped once.
pub fn parse_reply(content: &str, batch: &Batch) -> Result<Vec<Translation>, TranslateError> {
    let expected = batch.units.len();
    let value: Value = serde_json::from_str(strip_fences(content))
        .map_err(|e| TranslateError::Reply(format!("not valid JSON: {e}")))?;

    let value = unwrap_wrapper(value, &batch.headword);

    let items: Vec<Value> = match value {
        Value::Array(list) => {
            if list.len() != expected {
                return Err(TranslateError::Reply(format!(
                    "expected {expected} items, got {}",
                    list.len()
                )));
            }
            list
        }
        Value::Object(mut map) => {
            let wanted: Vec<String> = (1..=expected).map(|i| i.to_string()).collect();
            let mut got: Vec<&String> = map.keys().collect();
            got.sort();
            let mut want_sorted: Vec<&String> = wanted.iter().collect();
            want_sorted.sort();
            if got != want_sorted {
                return Err(TranslateError::Reply(format!(
                    "expected keys 1..{expected}, got {}",
                    map.keys().cloned().collect::<Vec<_>>().join(", ")
                )));
            }
            wanted
                .iter()
                .filter_map(|k| map.remove(k))
                .collect()
        }
        other => {
            return Err(TranslateError::Reply(format!(
                "expected an object or a list, got {other}"
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| item_translation(item, batch.kind).ok_or_else(|| {
            TranslateError::Reply(format!("item {} has no usable text", i + 1))
        }))
        .collect()
}

/// Peels up to two wrapper levels: `{"headword": "hus", "definitions": {..}}`,
/// `{"hus": {"definitions": {..}}}` and the single-level forms.
fn unwrap_wrapper(value: Value, headword: &str) -> Value {
    let headword = headword.to_lowercase();
    let mut value = value;

    for _ in 0..2 {
        let mut map = match value {
            Value::Object(map) => map,
            other => return other,
        };
        if map.contains_key("1") {
            return Value::Object(map);
        }
        // an echoed headword next to the payload
        if map.len() > 1 && map.get("headword").is_some_and(Value::is_string) {
            map.remove("headword");
        }
        if map.len() != 1 {
            return Value::Object(map);
        }

        let is_wrapper = map.keys().next().is_some_and(|k| {
            let k = k.to_lowercase();
            k == "definitions" || k == "fixed_expressions" || k == headword
        });
        if !is_wrapper {
            return Value::Object(map);
        }

        value = map.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null);
    }

    value
}

fn field(map: &Map<String, Value>, name: &str) -> String {
    map.get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn item_translation(item: Value, kind: UnitKind) -> Option<Translation> {
    let t = match item {
        Value::String(s) => {
            let s = s.trim().to_string();
            match kind {
                UnitKind::PartOfSpeech => Translation {
                    lemma: s.clone(),
                    gloss: s,
                },
                _ => Translation {
                    lemma: String::new(),
                    gloss: s,
                },
            }
        }
        Value::Object(map) => Translation {
            lemma: field(&map, "lemma"),
            gloss: field(&map, "gloss"),
        },
        _ => return None,
    };

    (!t.lemma.is_empty() || !t.gloss.is_empty()).then_some(t)
}
