/// Environment variable names used by this crate for convenient
/// configuration of formatters from services.
///
/// These are purely helpers; the formatter types themselves never read the
/// environment unless asked to via `from_env`.

/// chrono `strftime` pattern for the record datetime.
pub const LOG_FORMATTER_DATE_FORMAT_ENV: &str = "LOG_FORMATTER_DATE_FORMAT";

/// Application name injected as `application` into every line.
pub const LOG_FORMATTER_APPLICATION_ENV: &str = "LOG_FORMATTER_APPLICATION";

/// Category used when a record's context carries none.
pub const LOG_FORMATTER_DEFAULT_CATEGORY_ENV: &str = "LOG_FORMATTER_DEFAULT_CATEGORY";

/// `true`/`false` switch for JSON-friendly line breaks.
pub const LOG_FORMATTER_ALLOW_INLINE_LINE_BREAKS_ENV: &str = "LOG_FORMATTER_ALLOW_INLINE_LINE_BREAKS";

/// Output style, `bracketed` or `pure-json`.
pub const LOG_FORMATTER_STYLE_ENV: &str = "LOG_FORMATTER_STYLE";

/// Process environment lookup, suitable for the `from_lookup` constructors.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Treat blank values as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Parse a boolean-ish value: `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
