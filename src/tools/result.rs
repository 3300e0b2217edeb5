//! Classification and rendering of tool results.
//!
//! Every key of a result object is classified once into a [`ResultValue`];
//! rendering matches on the variants exhaustively.
//!
//! Rules, in order:
//! 1. key `status_code` holding an integer in 100..=599 is a [`ResultValue::StatusCode`]
//! 2. JSON numbers and numeric-looking strings are [`ResultValue::NumericStat`]
//! 3. `null` is dropped
//! 4. anything else is a [`ResultValue::TextBlock`] (arrays and objects pretty-printed)

use std::fmt::Write as _;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

const STATUS_KEY: &str = "status_code";

/// Key used when the backend returns a bare value instead of an object.
pub const BARE_RESULT_KEY: &str = "result";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultValue {
    NumericStat { value: f64, display: String },
    TextBlock { text: String },
    StatusCode { code: u16 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEntry {
    pub key: String,
    pub label: String,
    pub value: ResultValue,
}

/// A classified tool run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub entries: Vec<ResultEntry>,
    pub raw: Value,
}

impl ToolResult {
    pub fn from_data(raw: Value) -> Self {
        Self {
            entries: classify(&raw),
            raw,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&ResultEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn render(&self) -> String {
        render(&self.entries)
    }
}

/// Classify every key of `data`. Non-object data is a single `result` entry.
pub fn classify(data: &Value) -> Vec<ResultEntry> {
    match data {
        Value::Object(map) => classify_map(map),
        other => classify_one(BARE_RESULT_KEY, other).into_iter().collect(),
    }
}

fn classify_map(map: &Map<String, Value>) -> Vec<ResultEntry> {
    map.iter()
        .filter_map(|(key, value)| classify_one(key, value))
        .collect()
}

fn classify_one(key: &str, value: &Value) -> Option<ResultEntry> {
    let value = classify_value(key, value)?;
    Some(ResultEntry {
        key: key.to_string(),
        label: humanize(key),
        value,
    })
}

pub fn classify_value(key: &str, value: &Value) -> Option<ResultValue> {
    if key == STATUS_KEY {
        if let Some(code) = value.as_u64().filter(|c| (100..=599).contains(c)) {
            return Some(ResultValue::StatusCode { code: code as u16 });
        }
    }

    match value {
        Value::Null => None,
        Value::Number(n) => Some(ResultValue::NumericStat {
            value: n.as_f64().unwrap_or_default(),
            display: n.to_string(),
        }),
        Value::String(s) => Some(match numeric(s) {
            Some(value) => ResultValue::NumericStat {
                value,
                display: s.trim().to_string(),
            },
            None => ResultValue::TextBlock { text: s.clone() },
        }),
        Value::Bool(b) => Some(ResultValue::TextBlock { text: b.to_string() }),
        Value::Array(_) | Value::Object(_) => Some(ResultValue::TextBlock {
            text: serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        }),
    }
}

fn numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `word_count` → `Word Count`, `readingTime` → `Reading Time`.
pub fn humanize(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in key.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain-text rendering: stat tiles and status codes first, then text blocks.
pub fn render(entries: &[ResultEntry]) -> String {
    let mut tiles = Vec::new();
    let mut blocks = Vec::new();

    for entry in entries {
        match &entry.value {
            ResultValue::NumericStat { display, .. } => {
                tiles.push(format!("{}: {}", entry.label, display));
            }
            ResultValue::StatusCode { code } => {
                let reason = StatusCode::from_u16(*code)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("");
                tiles.push(format!("{}: {} {}", entry.label, code, reason).trim_end().to_string());
            }
            ResultValue::TextBlock { text } => blocks.push((entry.label.as_str(), text.as_str())),
        }
    }

    let mut out = String::new();
    if !tiles.is_empty() {
        out.push_str(&tiles.join("  |  "));
        out.push('\n');
    }
    for (label, text) in blocks {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{label}");
        for line in text.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification_rules() {
        let result = ToolResult::from_data(json!({
            "word_count": 120,
            "reading_time": "4.5",
            "status_code": 301,
            "slug": "hello-world",
            "headers": {"location": "/new"},
            "missing": null
        }));

        assert_eq!(
            result.entry("word_count").unwrap().value,
            ResultValue::NumericStat { value: 120.0, display: "120".into() }
        );
        assert_eq!(
            result.entry("reading_time").unwrap().value,
            ResultValue::NumericStat { value: 4.5, display: "4.5".into() }
        );
        assert_eq!(result.entry("status_code").unwrap().value, ResultValue::StatusCode { code: 301 });
        assert_eq!(
            result.entry("slug").unwrap().value,
            ResultValue::TextBlock { text: "hello-world".into() }
        );
        assert!(matches!(result.entry("headers").unwrap().value, ResultValue::TextBlock { .. }));
        assert!(result.entry("missing").is_none());
    }

    #[test]
    fn test_status_code_out_of_range_is_numeric() {
        let entries = classify(&json!({"status_code": 42}));
        assert!(matches!(entries[0].value, ResultValue::NumericStat { .. }));
    }

    #[test]
    fn test_bare_value() {
        let entries = classify(&json!("3f2b-uuid"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, BARE_RESULT_KEY);
        assert_eq!(entries[0].label, "Result");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("word_count"), "Word Count");
        assert_eq!(humanize("readingTime"), "Reading Time");
        assert_eq!(humanize("status-code"), "Status Code");
        assert_eq!(humanize("url"), "Url");
    }

    #[test]
    fn test_render() {
        let rendered = ToolResult::from_data(json!({
            "characters": 11,
            "status_code": 404,
            "text": "line one\nline two"
        }))
        .render();

        assert!(rendered.starts_with("Characters: 11  |  Status Code: 404 Not Found\n"));
        assert!(rendered.contains("\nText\n  line one\n  line two\n"));
    }
}
