#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Validation of the reasoning backend's reply.
//!
//! A reply is accepted when a JSON object carrying a `remark` and a non-empty
//! `feedback` string can be found in it. Everything else about the object is
//! repaired rather than rejected. Anything short of that is replaced by the
//! fixed fallback verdict.

use serde_json::{Map, Value};

use crate::{
    constants::{DEFAULT_CONFIDENCE, MAX_CONFIDENCE, MIN_CONFIDENCE},
    types::{Remark, Verdict},
};

/// `backend_used` value marking a fallback verdict.
pub const FALLBACK_BACKEND: &str = "fallback";

/// Feedback carried by every fallback verdict.
pub const FALLBACK_FEEDBACK: &str = "We could not complete an automated review of this submission. \
     Please check it against each of the listed criteria; an instructor will review it if needed.";

/// Builds the fixed verdict used whenever no usable reply exists.
pub fn fallback_verdict(latency_ms: u64) -> Verdict {
    Verdict {
        remark: Remark::CanImprove,
        feedback: FALLBACK_FEEDBACK.to_string(),
        criteria_met: Vec::new(),
        areas_for_improvement: vec![
            "Compare the submission against each criterion of the assignment".to_string(),
        ],
        confidence: MIN_CONFIDENCE,
        backend_used: FALLBACK_BACKEND.to_string(),
        latency_ms,
    }
}

/// Finds a JSON object in a model reply.
///
/// Tried in order: the whole trimmed reply, the first ```json fenced block,
/// the first `{` in the text that starts a valid JSON value.
pub fn extract_json(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if let Ok(Value::Object(object)) = serde_json::from_str(trimmed) {
        return Some(object);
    }

    if let Some(block) = fenced_json_block(trimmed)
        && let Ok(Value::Object(object)) = serde_json::from_str(block)
    {
        return Some(object);
    }

    first_json_object(trimmed)
}

/// Contents of the first fenced block tagged `json`.
fn fenced_json_block(content: &str) -> Option<&str> {
    let fence = "```";
    let mut search = content;
    loop {
        let start = search.find(fence)?;
        let after_start = &search[start + fence.len()..];
        let line_end = after_start.find('\n')?;
        let tag = after_start[..line_end].trim();
        let rest = &after_start[line_end + 1..];
        if tag.eq_ignore_ascii_case("json") {
            let end = rest.find(fence)?;
            return Some(rest[..end].trim());
        }
        search = after_start;
    }
}

/// First JSON object embedded anywhere in `content`.
fn first_json_object(content: &str) -> Option<Map<String, Value>> {
    content
        .char_indices()
        .filter(|(_, ch)| *ch == '{')
        .find_map(|(idx, _)| {
            let mut values =
                serde_json::Deserializer::from_str(&content[idx..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(Value::Object(object))) => Some(object),
                _ => None,
            }
        })
}

/// Non-empty, trimmed strings of a JSON array; empty for anything else.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Confidence from a JSON value: clamped when numeric, the default otherwise.
fn confidence(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE))
}

/// Turns a raw reply into a verdict. Never fails: a reply without a usable
/// `remark` and `feedback` yields [`fallback_verdict`].
///
/// An unknown remark becomes `Can Improve`; feedback is kept as sent.
pub fn parse_and_validate(raw: &str, backend_used: &str, latency_ms: u64) -> Verdict {
    let Some(object) = extract_json(raw) else {
        tracing::warn!(backend = backend_used, "Reply is not structured; applying fallback");
        return fallback_verdict(latency_ms);
    };

    let Some(remark) = object.get("remark").and_then(Value::as_str) else {
        tracing::warn!(backend = backend_used, "Reply has no remark; applying fallback");
        return fallback_verdict(latency_ms);
    };
    let Some(feedback) = object
        .get("feedback")
        .and_then(Value::as_str)
        .filter(|feedback| !feedback.trim().is_empty())
    else {
        tracing::warn!(backend = backend_used, "Reply has no feedback; applying fallback");
        return fallback_verdict(latency_ms);
    };

    let remark = Remark::from_label(remark).unwrap_or_else(|| {
        tracing::debug!(remark, "Coercing unknown remark");
        Remark::CanImprove
    });

    Verdict {
        remark,
        feedback: feedback.to_string(),
        criteria_met: string_list(object.get("criteriaMet")),
        areas_for_improvement: string_list(object.get("areasForImprovement")),
        confidence: confidence(object.get("confidence")),
        backend_used: backend_used.to_string(),
        latency_ms,
    }
}
