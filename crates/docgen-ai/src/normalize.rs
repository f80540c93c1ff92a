//! Normalization of free-form AI responses.
//!
//! Responses may be strict JSON, JSON inside a code fence, or prose. Every
//! path yields a well-formed record; parse failures never reach the caller.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```").expect("Invalid fence regex")
});
static WARNING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t>*-]*((?:note|warning|caution)\s*:.*?)\s*$")
        .expect("Invalid warning line regex")
});
static NOTE_THAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bnote that[^.\n]*\.?").expect("Invalid note sentence regex")
});
static CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)confidence[\s:=]+([0-9]*\.?[0-9]+)").expect("Invalid confidence regex")
});
static VALIDATION_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:validation\s+result|status|is_valid|valid)\s*[:=]\s*\**\s*(pass|passed|fail|failed|true|false)\b",
    )
    .expect("Invalid validation status regex")
});
static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s*(.+?)\s*$").expect("Invalid section header regex"));
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*+]|\d+[.)])\s+").expect("Invalid list marker regex"));

/// Canonical form of an AI conversion response.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub content: String,
    pub warnings: Vec<String>,
    /// Always within `[0, 1]`; `1.0` when the response states none.
    pub confidence: f64,
    pub metadata: Map<String, Value>,
}

/// Canonical form of an AI validation response.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFeedback {
    /// `None` when the response never states a verdict.
    pub is_valid: Option<bool>,
    pub issues: Vec<String>,
    pub confidence: f64,
    pub suggestions: Vec<String>,
}

pub fn normalize_response(raw: &str) -> NormalizedResponse {
    if let Some(object) = json_object(raw)
        && let Some(content) = object.get("content").and_then(Value::as_str)
    {
        return NormalizedResponse {
            content: content.to_string(),
            warnings: string_list(object.get("warnings")),
            confidence: confidence_value(object.get("confidence")),
            metadata: object
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        };
    }
    let content = unfence(raw).trim().to_string();
    let mut warnings: Vec<String> = WARNING_LINE
        .captures_iter(raw)
        .map(|captures| captures[1].to_string())
        .collect();
    for sentence in NOTE_THAT.find_iter(raw) {
        let sentence = sentence.as_str().trim().to_string();
        if !warnings.iter().any(|warning| warning.contains(&sentence)) {
            warnings.push(sentence);
        }
    }
    NormalizedResponse {
        content,
        warnings,
        confidence: inline_confidence(raw),
        metadata: Map::new(),
    }
}

pub fn parse_validation(raw: &str) -> ValidationFeedback {
    if let Some(object) = json_object(raw)
        && (object.contains_key("is_valid") || object.contains_key("issues"))
    {
        return ValidationFeedback {
            is_valid: object.get("is_valid").and_then(Value::as_bool),
            issues: string_list(object.get("issues")),
            confidence: confidence_value(object.get("confidence")),
            suggestions: string_list(object.get("suggestions")),
        };
    }
    let is_valid = VALIDATION_STATUS.captures(raw).map(|captures| {
        matches!(
            captures[1].to_ascii_lowercase().as_str(),
            "pass" | "passed" | "true"
        )
    });
    ValidationFeedback {
        is_valid,
        issues: section_items(raw, "issue"),
        confidence: inline_confidence(raw),
        suggestions: section_items(raw, "suggestion"),
    }
}

/// Parses the response, or the first fenced block in it, as a JSON object.
fn json_object(raw: &str) -> Option<Map<String, Value>> {
    let direct = serde_json::from_str::<Value>(raw.trim()).ok();
    let value = direct.or_else(|| {
        FENCED_BLOCK
            .captures(raw)
            .and_then(|captures| serde_json::from_str::<Value>(captures[1].trim()).ok())
    })?;
    match value {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

/// Strips a code fence that wraps the whole response.
fn unfence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCED_BLOCK.captures(trimmed) {
        Some(captures) if captures.get(0).is_some_and(|m| m.as_str() == trimmed) => {
            captures.get(1).map_or(trimmed, |inner| inner.as_str())
        }
        _ => trimmed,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return match value {
            Some(Value::String(text)) if !text.trim().is_empty() => vec![text.clone()],
            _ => Vec::new(),
        };
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text.clone()),
            Value::Object(object) => object
                .get("message")
                .or_else(|| object.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

fn confidence_value(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|c: &f64| c.is_finite()).map_or(1.0, |c| c.clamp(0.0, 1.0))
}

fn inline_confidence(raw: &str) -> f64 {
    CONFIDENCE
        .captures(raw)
        .and_then(|captures| captures[1].parse::<f64>().ok())
        .filter(|c| c.is_finite())
        .map_or(1.0, |c| c.clamp(0.0, 1.0))
}

/// Items listed under markdown headers whose title contains `keyword`.
///
/// List items are always taken; unmarked lines only until the first blank
/// line after the header.
fn section_items(raw: &str, keyword: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut in_section = false;
    let mut past_blank = false;
    for line in raw.lines() {
        let trimmed = line.trim();
        if let Some(captures) = SECTION_HEADER.captures(trimmed) {
            in_section = captures[1].to_ascii_lowercase().contains(keyword);
            past_blank = false;
            continue;
        }
        if !in_section {
            continue;
        }
        if trimmed.is_empty() {
            past_blank = true;
            continue;
        }
        if LIST_MARKER.is_match(trimmed) {
            items.push(LIST_MARKER.replace(trimmed, "").into_owned());
        } else if !past_blank {
            items.push(trimmed.to_string());
        }
    }
    items
}
