//! Escaping and literal-formatting rules enforced on every value
//! interpolated into a SPARQL string. Centralizing this here
//! means the template layer never hand-rolls string quoting.

use chrono::{DateTime, Utc};

use crate::error::{EngineError, Result};

/// Escape a string for use inside a double-quoted SPARQL string literal.
/// Rejects control characters outside the escapable set instead of
/// silently dropping them.
pub fn escape_string_literal(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            '\0' => {
                return Err(EngineError::InvalidQueryInput(
                    "NUL byte in string literal".to_string(),
                ))
            }
            c if c.is_control() => {
                return Err(EngineError::InvalidQueryInput(format!(
                    "unescapable control character U+{:04X} in string literal",
                    c as u32
                )))
            }
            c => out.push(c),
        }
    }
    out.push('"');
    Ok(out)
}

/// Validate and sanitize an IRI local name (an already-charset-validated
/// memory/session/agent/project id). Re-checks at the point of
/// interpolation rather than trusting the caller's earlier validation.
pub fn escape_local_name(raw: &str) -> Result<String> {
    crate::registry::sanitize_local_name(raw)
}

/// Format an instant as a canonical `"<ISO-8601>"^^xsd:dateTime` literal.
pub fn format_datetime(instant: &DateTime<Utc>) -> String {
    format!(
        "\"{}\"^^xsd:dateTime",
        instant.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
    )
}

/// Format a confidence value with a fixed decimal formatter, independent of
/// locale.
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.6}", confidence)
}

/// Format a non-negative integer literal with an explicit xsd:integer
/// datatype.
pub fn format_integer(value: u64) -> String {
    format!("\"{}\"^^xsd:integer", value)
}
