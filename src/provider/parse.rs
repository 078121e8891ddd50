//! Model response parsing
//!
//! Model output is inherently unreliable free text. This parser degrades
//! gracefully instead of failing: structured JSON is preferred, a line-oriented
//! heuristic extractor catches non-JSON responses, and the worst case is an
//! empty findings list with a default summary, never an error.

use crate::analysis::{Finding, Severity};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Summary used when the model response carries none
const DEFAULT_SUMMARY: &str = "No summary provided.";

/// Findings and summary extracted from raw model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub findings: Vec<Finding>,
    pub summary: String,
}

/// Raw wire shape of a single finding, before normalization.
///
/// Every field is optional; `line` and `severity` are kept as raw JSON values
/// because models emit them as numbers, strings, or worse. `normalize` turns
/// this into a strict `Finding` with a default for every missing or malformed
/// value.
#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    line: Option<serde_json::Value>,
    #[serde(default)]
    severity: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    findings: Vec<RawFinding>,
}

impl RawFinding {
    fn normalize(self) -> Finding {
        let line = match self.line {
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };

        let severity = self
            .severity
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(Severity::from_str)
            .unwrap_or(Severity::Info);

        Finding {
            file: self.file.unwrap_or_default(),
            line,
            severity,
            message: self.message.unwrap_or_default(),
            rule: self.rule.unwrap_or_else(|| "general".to_string()),
            suggestion: self.suggestion,
        }
    }
}

/// Parse raw model output into findings and a summary.
///
/// Tries, in order: a fenced ```json block, the first brace-balanced object
/// containing a `findings` key, the raw text as-is. If none of those parse as
/// the expected JSON shape, falls back to the line-oriented text extractor.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let candidate = extract_json_candidate(raw);

    match serde_json::from_str::<RawResponse>(candidate.trim()) {
        Ok(parsed) => ParsedResponse {
            findings: parsed.findings.into_iter().map(RawFinding::normalize).collect(),
            summary: parsed.summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        },
        Err(_) => parse_text_response(raw),
    }
}

/// Locate the most likely JSON payload in the response text
fn extract_json_candidate(raw: &str) -> &str {
    if let Some(fenced) = extract_fenced_json(raw) {
        return fenced;
    }
    if let Some(object) = extract_findings_object(raw) {
        return object;
    }
    raw
}

/// Extract the contents of the first ```json ... ``` fenced block
fn extract_fenced_json(raw: &str) -> Option<&str> {
    let start = raw.find("```json")?;
    let body = &raw[start + "```json".len()..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// Extract the first `{` to last `}` span, if it mentions a findings key
fn extract_findings_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if start > end {
        return None;
    }
    let span = &raw[start..=end];
    span.contains("\"findings\"").then_some(span)
}

fn file_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:File|file)[:\s]+([^\s,]+)").unwrap())
}

fn line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:Line|line|L)[:\s]+(\d+)").unwrap())
}

fn severity_critical_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)critical|error|severe").unwrap())
}

fn severity_warning_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)warning|warn|caution").unwrap())
}

/// Fallback extractor for non-JSON responses.
///
/// Scans line by line, carrying the most recent `File:` token forward and
/// emitting a finding for every line with a `Line: N` marker and a colon.
/// Best-effort by design: sparse `File:` markers can attribute findings to the
/// wrong file, which callers accept as the cost of never failing.
fn parse_text_response(text: &str) -> ParsedResponse {
    let mut findings = Vec::new();
    let mut current_file = String::new();

    for line in text.lines() {
        if let Some(caps) = file_pattern().captures(line) {
            current_file = caps[1].to_string();
        }

        let line_number: u32 = line_pattern()
            .captures(line)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0);

        let severity = if severity_critical_pattern().is_match(line) {
            Severity::Critical
        } else if severity_warning_pattern().is_match(line) {
            Severity::Warning
        } else {
            Severity::Info
        };

        if line.contains(':') && line_number > 0 {
            findings.push(Finding {
                file: current_file.clone(),
                line: line_number,
                severity,
                message: line.trim().to_string(),
                rule: "parsed".to_string(),
                suggestion: None,
            });
        }
    }

    let summary = if findings.is_empty() {
        "No structured findings could be extracted from the response.".to_string()
    } else {
        format!("Found {} potential issues.", findings.len())
    };

    ParsedResponse { findings, summary }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_json() {
        let raw = r#"{"summary":"ok","findings":[{"file":"src/a.ts","line":2,"severity":"warning","rule":"cleanCode","message":"x"}]}"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.summary, "ok");
        assert_eq!(parsed.findings.len(), 1);

        let f = &parsed.findings[0];
        assert_eq!(f.file, "src/a.ts");
        assert_eq!(f.line, 2);
        assert_eq!(f.severity, Severity::Warning);
        assert_eq!(f.rule, "cleanCode");
        assert_eq!(f.message, "x");
        assert!(f.suggestion.is_none());
    }

    #[test]
    fn test_parse_fenced_json_block() {
        let raw = "Here is my review:\n```json\n{\"summary\":\"fine\",\"findings\":[]}\n```\nThanks!";
        let parsed = parse_response(raw);
        assert_eq!(parsed.summary, "fine");
        assert!(parsed.findings.is_empty());
    }

    #[test]
    fn test_parse_embedded_object_with_noise() {
        let raw = "Sure! {\"summary\":\"s\",\"findings\":[{\"file\":\"a.rs\",\"line\":1}]} done.";
        let parsed = parse_response(raw);
        assert_eq!(parsed.summary, "s");
        assert_eq!(parsed.findings.len(), 1);
    }

    #[test]
    fn test_line_as_string_is_coerced() {
        let raw = r#"{"findings":[{"file":"a.rs","line":"42"}]}"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.findings[0].line, 42);
    }

    #[test]
    fn test_unparsable_line_defaults_to_zero() {
        let raw = r#"{"findings":[{"file":"a.rs","line":"forty-two"}]}"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.findings[0].line, 0);
    }

    #[test]
    fn test_odd_typed_fields_do_not_break_structured_parse() {
        let raw = r#"{"summary":"s","findings":[{"file":"a.rs","line":12.7,"severity":3}]}"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.summary, "s");
        assert_eq!(parsed.findings[0].line, 12);
        assert_eq!(parsed.findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_invalid_severity_coerced_to_info() {
        let raw = r#"{"findings":[{"file":"a.rs","line":1,"severity":"nonsense"}]}"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.findings[0].severity, Severity::Info);

        let raw = r#"{"findings":[{"file":"a.rs","line":1}]}"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let raw = r#"{"findings":[{}]}"#;
        let parsed = parse_response(raw);
        let f = &parsed.findings[0];
        assert_eq!(f.file, "");
        assert_eq!(f.line, 0);
        assert_eq!(f.rule, "general");
        assert_eq!(f.message, "");
        assert_eq!(parsed.summary, "No summary provided.");
    }

    #[test]
    fn test_plain_text_never_fails() {
        let parsed = parse_response("not json at all");
        assert!(parsed.findings.is_empty());
        assert!(!parsed.summary.is_empty());
    }

    #[test]
    fn test_text_fallback_extracts_findings() {
        let text = "\
Review results:
File: src/main.rs
Line: 10 - warning: this looks suspicious
Line: 25 - critical error in handler
Some commentary without markers.
";
        let parsed = parse_response(text);
        assert_eq!(parsed.findings.len(), 2);

        assert_eq!(parsed.findings[0].file, "src/main.rs");
        assert_eq!(parsed.findings[0].line, 10);
        assert_eq!(parsed.findings[0].severity, Severity::Warning);
        assert_eq!(parsed.findings[0].rule, "parsed");

        assert_eq!(parsed.findings[1].line, 25);
        assert_eq!(parsed.findings[1].severity, Severity::Critical);

        assert_eq!(parsed.summary, "Found 2 potential issues.");
    }

    #[test]
    fn test_text_fallback_carries_file_forward() {
        let text = "\
File: src/a.rs
Line: 3: something
Line: 7: something else
";
        let parsed = parse_response(text);
        assert_eq!(parsed.findings.len(), 2);
        assert_eq!(parsed.findings[1].file, "src/a.rs");
    }
}
