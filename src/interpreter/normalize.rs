//! Normalization of raw interpreter output
//!
//! Language models wrap their JSON in markdown fences, double-escape it, or
//! answer with numbers spelled as strings. Everything here is about turning
//! such output into a complete [`FilenameGuess`] without ever failing.

use super::{FilenameGuess, InterpreterResponse};
use serde_json::Value;

/// Converts any interpreter response into a complete guess
pub(crate) fn normalize_response(response: &InterpreterResponse) -> FilenameGuess {
    match response {
        InterpreterResponse::Structured(value) => guess_from_value(value),
        InterpreterResponse::Text(text) => guess_from_text(text),
    }
}

/// Decodes a textual response, null-filling everything on failure
///
/// Well-formed JSON is decoded as is. Only when that fails are leaked
/// escapes cleaned up, and as a last resort escaped quotes are unescaped.
fn guess_from_text(text: &str) -> FilenameGuess {
    let trimmed = text.trim();

    // The whole answer may itself be a JSON encoded string
    let unwrapped = match serde_json::from_str::<String>(trimmed) {
        Ok(inner) => inner,
        Err(_) => trimmed.to_string(),
    };

    let cleaned = clean_escapes(&unwrapped);

    let decoded = decode_object(&unwrapped)
        .or_else(|| decode_object(&cleaned))
        .or_else(|| decode_object(&cleaned.replace("\\\"", "\"")));

    match decoded {
        Some(value) => guess_from_value(&value),
        None => {
            tracing::debug!(response = text, "undecodable interpreter response");
            FilenameGuess::unknown()
        }
    }
}

fn decode_object(text: &str) -> Option<Value> {
    serde_json::from_str(extract_json_block(text)).ok()
}

/// Strips escape sequences models tend to leak into their JSON
///
/// Escaped underscores lose their backslash, escaped and literal line breaks
/// become spaces and stray backslashes are dropped. Escaped quotes and
/// unicode escapes are kept so that JSON strings survive.
pub(crate) fn clean_escapes(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some('n') | Some('r') | Some('t') => {
                    chars.next();
                    cleaned.push(' ');
                }
                Some('"') => {
                    chars.next();
                    cleaned.push_str("\\\"");
                }
                Some('\\') => {
                    chars.next();
                }
                Some('u') if is_unicode_escape(&chars) => cleaned.push('\\'),
                _ => {}
            },
            '\n' | '\r' | '\t' => cleaned.push(' '),
            c => cleaned.push(c),
        }
    }

    cleaned
}

/// True if the upcoming characters form the `uXXXX` tail of a unicode escape
fn is_unicode_escape(chars: &std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    let tail: Vec<char> = chars.clone().skip(1).take(4).collect();
    tail.len() == 4 && tail.iter().all(char::is_ascii_hexdigit)
}

/// Isolates the JSON object inside a response
///
/// Prefers a markdown ```json fence, then the outermost pair of braces and
/// finally falls back to the whole text.
fn extract_json_block(response: &str) -> &str {
    let start_marker = "```json";
    let end_marker = "```";

    if let Some(start_pos) = response.find(start_marker) {
        let remaining = &response[start_pos + start_marker.len()..];
        if let Some(end_pos) = remaining.find(end_marker) {
            return remaining[..end_pos].trim();
        }
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response.trim(),
    }
}

/// Builds a guess from a decoded value, coercing each field on its own
pub(crate) fn guess_from_value(value: &Value) -> FilenameGuess {
    let Some(object) = value.as_object() else {
        return FilenameGuess::unknown();
    };

    FilenameGuess {
        series_name: object.get("series_name").and_then(coerce_text),
        season_number: object.get("season_number").and_then(coerce_number),
        episode_number: object.get("episode_number").and_then(coerce_number),
        episode_title: object.get("episode_title").and_then(coerce_text),
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("null"))
                .then(|| trimmed.to_string())
        }
        // Series like "24" come back as numbers
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(int) = n.as_u64() {
                u32::try_from(int).ok()
            } else {
                n.as_f64().and_then(integral_f64)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<u32>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

fn integral_f64(f: f64) -> Option<u32> {
    (f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32)
}
