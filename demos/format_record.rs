use json_context_formatter::{ContextFormatter, FormatStyle, FormatterConfig, Level, LogRecord};
use serde_json::json;

/// Formats one record in both styles and prints the lines.
///
/// Configuration is read from `LOG_FORMATTER_*` variables, with an
/// application name filled in when none is set.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = FormatterConfig::from_env()?;
    if config.application.is_none() {
        config.application = Some("billing-api".to_string());
    }

    let context = json!({
        "invoice_id": 1042,
        "message": "user supplied text",
        "context": { "attempt": 3 },
        "payload": { "lines": ["one", "two"] },
    });
    let record = LogRecord::new("payments", Level::Warning, "invoice retry\nscheduled")
        .with_context(context.as_object().cloned().unwrap_or_default());

    for style in [FormatStyle::Bracketed, FormatStyle::PureJson] {
        let formatter = ContextFormatter::new(style, config.clone())?;
        print!("{}", formatter.format(&record)?);
    }

    Ok(())
}
