use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

use crate::report::AnalysisReport;

pub const ENVELOPE_FIELD: &str = "wrapper_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasoningMarkers {
    pub open: &'static str,
    pub close: &'static str,
}

impl ReasoningMarkers {
    pub const THINK: Self = Self {
        open: "<think>",
        close: "</think>",
    };
}

impl Default for ReasoningMarkers {
    fn default() -> Self {
        Self::THINK
    }
}

#[derive(Debug)]
pub enum NormalizeError {
    Empty,
    Json(serde_json::Error),
    Null,
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "payload is empty"),
            Self::Json(err) => write!(f, "payload is not valid json: {err}"),
            Self::Null => write!(f, "payload is json null"),
        }
    }
}

impl std::error::Error for NormalizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

/// Removes the first complete marker span and trims what is left. Text with
/// no complete span comes back untouched.
pub fn strip_reasoning(text: &str, markers: ReasoningMarkers) -> Cow<'_, str> {
    let Some(start) = text.find(markers.open) else {
        return Cow::Borrowed(text);
    };
    let after_open = start + markers.open.len();
    let Some(close) = text[after_open..].find(markers.close) else {
        return Cow::Borrowed(text);
    };
    let end = after_open + close + markers.close.len();
    let mut rest = String::with_capacity(text.len() - (end - start));
    rest.push_str(&text[..start]);
    rest.push_str(&text[end..]);
    Cow::Owned(rest.trim().to_string())
}

/// Drops exactly one leading and one trailing `"` when both are present.
pub fn unwrap_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Replaces `\"` and `\n` escape sequences. Nothing else is decoded.
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\\\"", "\"").replace("\\n", "\n"))
}

pub fn decode_payload(raw: &str) -> Result<Value, NormalizeError> {
    let stripped = strip_reasoning(raw, ReasoningMarkers::THINK);
    let unquoted = unwrap_quotes(stripped.trim());
    let text = unescape(unquoted);
    if text.trim().is_empty() {
        return Err(NormalizeError::Empty);
    }
    let value: Value = serde_json::from_str(&text).map_err(NormalizeError::Json)?;
    if value.is_null() {
        return Err(NormalizeError::Null);
    }
    Ok(value)
}

/// Returns the `wrapper_data` payload, or the whole value when the backend
/// left the envelope out.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut object) => match object.remove(ENVELOPE_FIELD) {
            Some(inner) if !inner.is_null() => inner,
            _ => {
                tracing::warn!(
                    event = "normalize.envelope_missing",
                    "wrapper_data not found, using full object"
                );
                Value::Object(object)
            }
        },
        other => {
            tracing::warn!(
                event = "normalize.envelope_missing",
                kind = value_kind(&other),
                "payload is not an object, using it as is"
            );
            other
        }
    }
}

/// Strips reasoning, one quote layer and escapes, then parses. A payload that
/// still fails to parse yields no report.
pub fn normalize_report(raw: &str) -> Option<AnalysisReport> {
    match decode_payload(raw) {
        Ok(value) => Some(AnalysisReport::from_value(&unwrap_envelope(value))),
        Err(err) => {
            tracing::warn!(
                event = "normalize.parse_failed",
                error = %err,
                payload = %raw,
                "failed to parse analysis payload"
            );
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
