use serde_json::Value;

use crate::error::FormatError;

/// Renders values as text for log lines and applies the line-break policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stringifier {
    allow_inline_line_breaks: bool,
}

impl Stringifier {
    pub fn new(allow_inline_line_breaks: bool) -> Self {
        Self { allow_inline_line_breaks }
    }

    pub fn allows_inline_line_breaks(&self) -> bool {
        self.allow_inline_line_breaks
    }

    /// Convert `value` to text, then apply the line-break policy.
    pub fn stringify(&self, value: &Value) -> Result<String, FormatError> {
        Ok(self.replace_newlines(convert_to_string(value)?))
    }

    /// Apply the line-break policy to already rendered text.
    ///
    /// With inline breaks disallowed every CR, LF or CRLF becomes a single
    /// space. With inline breaks allowed, text that looks like a JSON object
    /// gets its `\r`/`\n` escapes expanded; anything else is left alone.
    pub fn replace_newlines(&self, text: String) -> String {
        if self.allow_inline_line_breaks {
            if text.starts_with('{') {
                return expand_json_escapes(&text);
            }
            return text;
        }
        collapse_line_breaks(&text)
    }
}

/// Text rendering of a single value.
///
/// `null` and booleans render as the bare tokens `NULL`, `true`, `false`;
/// numbers and strings render as themselves; arrays and objects are JSON
/// encoded.
pub fn convert_to_string(value: &Value) -> Result<String, FormatError> {
    Ok(match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        structured @ (Value::Array(_) | Value::Object(_)) => serde_json::to_string(structured)?,
    })
}

/// Replace CRLF, CR and LF with a single space each.
pub fn collapse_line_breaks(text: &str) -> String {
    if !text.contains(['\r', '\n']) {
        return text.to_string();
    }
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Turn the two-character escapes `\r` and `\n` into real line breaks.
///
/// This works on encoded text and does not look at surrounding backslashes,
/// so an escaped backslash followed by `n` is expanded as well.
pub fn expand_json_escapes(text: &str) -> String {
    text.replace("\\r", "\r").replace("\\n", "\n")
}
