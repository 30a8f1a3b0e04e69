//! Reply decoding: turn the model's text into a [`RawRecord`].
//!
//! Even when asked for bare JSON, VLMs occasionally wrap the object in
//! ` ```json ... ``` ` fences or break it over lines. Those artefacts are
//! removed before decoding; anything else that is not a single JSON object
//! is rejected. There is no repair beyond that: a reply that still fails to
//! decode becomes an extraction format error for its document.

use crate::record::RawRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// Clean and decode a model reply.
///
/// Steps (applied in order):
/// 1. Strip outer markdown fences
/// 2. Remove line breaks (JSON never needs them between tokens)
/// 3. Decode strictly as a JSON object, preserving field order
pub fn parse_record(reply: &str) -> Result<RawRecord, String> {
    let s = strip_json_fences(reply);
    let s = remove_line_breaks(&s);
    let trimmed = s.trim();

    if !trimmed.starts_with('{') {
        return Err(format!("expected a JSON object, got: {}", preview(trimmed)));
    }

    serde_json::from_str::<RawRecord>(trimmed).map_err(|e| e.to_string())
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").expect("valid fence regex")
});

fn strip_json_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Remove line breaks ───────────────────────────────────────────────

fn remove_line_breaks(input: &str) -> String {
    input.replace("\r\n", "").replace(['\n', '\r'], "")
}

/// First characters of a rejected reply, for error messages.
fn preview(s: &str) -> String {
    const MAX: usize = 40;
    if s.is_empty() {
        return "empty reply".to_string();
    }
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{:?}…", &s[..idx]),
        None => format!("{s:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawValue;

    #[test]
    fn plain_object() {
        let record = parse_record(r#"{"Full Name": "Asha Rao", "Gender": "F"}"#).expect("valid");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("Full Name"), Some(&RawValue::from("Asha Rao")));
    }

    #[test]
    fn fenced_object() {
        let reply = "```json\n{\n  \"Seat Number\": \"B1234\"\n}\n```";
        let record = parse_record(reply).expect("valid");
        assert_eq!(record.get("Seat Number"), Some(&RawValue::from("B1234")));
    }

    #[test]
    fn fence_without_language_tag() {
        let reply = "```\n{\"Percentage\": 91.2}\n```\n";
        assert!(parse_record(reply).is_ok());
    }

    #[test]
    fn multiline_object() {
        let reply = "{\r\n\"Subjects\": {\n\"Math\": 90,\n\"Science\": 85\n}\n}";
        let record = parse_record(reply).expect("valid");
        let subjects = record.get("Subjects").and_then(RawValue::as_group).expect("group");
        assert_eq!(subjects.len(), 2);
    }

    #[test]
    fn prose_is_rejected() {
        let err = parse_record("Sorry, I cannot read this image.").expect_err("not json");
        assert!(err.contains("expected a JSON object"), "got: {err}");
    }

    #[test]
    fn empty_reply_is_rejected() {
        let err = parse_record("   ").expect_err("empty");
        assert!(err.contains("empty reply"));
    }

    #[test]
    fn truncated_object_is_rejected() {
        assert!(parse_record(r#"{"Full Name": "Asha"#).is_err());
    }

    #[test]
    fn top_level_array_is_rejected() {
        assert!(parse_record(r#"[{"a": 1}]"#).is_err());
    }
}
