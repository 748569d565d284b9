/// Error type returned by record normalization, formatting and
/// configuration loading.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The record-to-mapping transform produced something other than a
    /// JSON object. This is an integration bug, not a runtime condition.
    #[error("expected an object from record normalization, got {found}")]
    InvalidInput { found: &'static str },

    #[error("invalid date format: {0:?}")]
    InvalidDateFormat(String),

    #[error("invalid value {value:?} for environment variable {key}")]
    InvalidEnvValue { key: &'static str, value: String },

    #[error("unknown format style: {0:?}")]
    UnknownStyle(String),

    #[error("unknown log level: {0:?}")]
    UnknownLevel(String),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Human-readable type name of a JSON value, used in error messages.
pub(crate) fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
