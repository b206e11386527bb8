//! Model output → `GeneratedInsight`.
//!
//! Three tiers, first success wins:
//! 1. Strict: unwrap a fenced block or the outermost `{...}`, normalize
//!    smart quotes, parse as a JSON object.
//! 2. Field regexes over the raw text, only if a `"title"` field is found.
//! 3. Plain-text heuristics over the non-empty lines.
//!
//! Parsing never fails; the worst case is a low-confidence record whose
//! content is the raw response.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::models::{GeneratedInsight, InsightType};

pub const DEFAULT_SUMMARY: &str = "AI-generated insights from Claude";
pub const DEFAULT_CONFIDENCE: f64 = 0.75;
pub const HEURISTIC_CONFIDENCE: f64 = 0.70;

const MAX_HEURISTIC_TITLE_CHARS: usize = 100;
const MAX_HEURISTIC_SUMMARY_CHARS: usize = 200;
const LOG_PREVIEW_CHARS: usize = 200;
const LOG_FAILURE_PREVIEW_CHARS: usize = 500;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());
static TITLE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""title":\s*"([^"]*)""#).unwrap());
static SUMMARY_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""summary":\s*"([^"]*(?:\\.[^"]*)*)""#).unwrap());
static CONFIDENCE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""confidenceScore":\s*([\d.]+)"#).unwrap());
static CONTENT_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""content":\s*"((?:[^"\\]|\\.)*)""#).unwrap());

/// `summary` may arrive as one string or as a list of bullet strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryField {
    Text(String),
    Bullets(Vec<Value>),
}

impl SummaryField {
    fn into_text(self) -> String {
        match self {
            SummaryField::Text(s) => s,
            SummaryField::Bullets(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" • "),
        }
    }
}

/// Shape requested from the model. A field of the wrong JSON type reads as
/// absent instead of failing the whole object.
#[derive(Debug, Default, Deserialize)]
struct RawInsight {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    summary: Option<SummaryField>,
    #[serde(default, rename = "keyMetrics", deserialize_with = "lenient")]
    key_metrics: Option<Map<String, Value>>,
    #[serde(default, rename = "confidenceScore", deserialize_with = "lenient")]
    confidence_score: Option<f64>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

/// Scores of zero or below mean "not provided"; anything else is clamped to [0, 1].
fn normalize_confidence(score: Option<f64>) -> f64 {
    match score {
        Some(s) if s.is_finite() && s > 0.0 => s.min(1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Parse a raw model response. Never fails.
pub fn parse_response(raw: &str, insight_type: InsightType) -> GeneratedInsight {
    if let Some(insight) = parse_strict(raw, insight_type) {
        return insight;
    }
    tracing::warn!(
        insight_type = %insight_type,
        preview = %preview(raw, LOG_FAILURE_PREVIEW_CHARS),
        "Strict JSON parse failed, trying field extraction"
    );

    if let Some(insight) = parse_fields(raw, insight_type) {
        return insight;
    }
    tracing::warn!(insight_type = %insight_type, "Field extraction found no title, using plain-text fallback");

    parse_plain_text(raw, insight_type)
}

fn json_candidate(raw: &str) -> String {
    let mut candidate = raw.trim();
    if let Some(inner) = CODE_FENCE.captures(candidate).and_then(|c| c.get(1)) {
        candidate = inner.as_str().trim();
    }
    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if end > start {
            candidate = &candidate[start..=end];
        }
    }
    candidate
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

fn parse_strict(raw: &str, insight_type: InsightType) -> Option<GeneratedInsight> {
    let candidate = json_candidate(raw);
    tracing::debug!(preview = %preview(&candidate, LOG_PREVIEW_CHARS), "Attempting strict JSON parse");

    let value: Value = serde_json::from_str(&candidate).ok()?;
    if !value.is_object() {
        return None;
    }
    let parsed: RawInsight = serde_json::from_value(value).unwrap_or_default();

    let insight = GeneratedInsight {
        title: non_empty(parsed.title).unwrap_or_else(|| insight_type.default_title()),
        content: non_empty(parsed.content).unwrap_or_else(|| raw.to_string()),
        summary: non_empty(parsed.summary.map(SummaryField::into_text))
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        key_metrics: parsed.key_metrics.unwrap_or_default(),
        confidence_score: normalize_confidence(parsed.confidence_score),
    };
    tracing::debug!(title = %insight.title, "Strict JSON parse succeeded");
    Some(insight)
}

fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

/// Known lossy edge: `content` stops at its first unescaped inner quote.
fn parse_fields(raw: &str, insight_type: InsightType) -> Option<GeneratedInsight> {
    let title = TITLE_FIELD.captures(raw)?.get(1)?.as_str().to_string();
    tracing::debug!(title = %title, "Recovered title by field extraction");

    let capture = |re: &Regex| {
        re.captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    Some(GeneratedInsight {
        title: non_empty(Some(title)).unwrap_or_else(|| insight_type.default_title()),
        content: non_empty(capture(&CONTENT_FIELD).map(|c| unescape_newlines(&c)))
            .unwrap_or_else(|| raw.to_string()),
        summary: non_empty(capture(&SUMMARY_FIELD).map(|s| unescape_newlines(&s)))
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        key_metrics: Map::new(),
        confidence_score: normalize_confidence(capture(&CONFIDENCE_FIELD).and_then(|s| s.parse().ok())),
    })
}

fn parse_plain_text(raw: &str, insight_type: InsightType) -> GeneratedInsight {
    let lines: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let title = match lines.first() {
        Some(first) if first.chars().count() <= MAX_HEURISTIC_TITLE_CHARS => first.to_string(),
        _ => insight_type.default_title(),
    };

    let summary = lines.iter().take(2).copied().collect::<Vec<_>>().join(" ");
    let summary = if summary.is_empty() {
        DEFAULT_SUMMARY.to_string()
    } else if summary.chars().count() > MAX_HEURISTIC_SUMMARY_CHARS {
        format!("{}...", preview(&summary, MAX_HEURISTIC_SUMMARY_CHARS))
    } else {
        summary
    };

    GeneratedInsight {
        title,
        content: raw.to_string(),
        summary,
        key_metrics: Map::new(),
        confidence_score: HEURISTIC_CONFIDENCE,
    }
}
