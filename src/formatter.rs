use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::FormatterConfig;
use crate::env::{env_lookup, non_empty, LOG_FORMATTER_STYLE_ENV};
use crate::error::{type_name, FormatError};
use crate::normalizer::{normalize, NESTED_KEY};
use crate::record::{DefaultRecordNormalizer, LogRecord, RecordNormalizer};
use crate::stringify::Stringifier;

type Vars = Map<String, Value>;

/// Builds the keys a variant puts in front of the normalized context.
pub type HeaderBuilder = fn(&Stringifier, &Vars) -> Result<Vars, FormatError>;

/// Builds the text a variant writes before the JSON object.
pub type PrefixBuilder = fn(&Stringifier, &Vars) -> Result<String, FormatError>;

/// What distinguishes one output format from another.
#[derive(Clone, Copy)]
pub struct Variant {
    pub name: &'static str,
    /// Top-level context keys that are moved under `context`.
    pub reserved_keys: &'static [&'static str],
    pub header: HeaderBuilder,
    pub prefix: PrefixBuilder,
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("reserved_keys", &self.reserved_keys)
            .finish_non_exhaustive()
    }
}

/// `[<datetime>] <channel>.<LEVEL>: <json>`, with `message` and `level`
/// leading the object.
pub const BRACKETED: Variant = Variant {
    name: "bracketed",
    reserved_keys: &["application", "level", "message", "prospectors", "timestamp", "type"],
    header: bracketed_header,
    prefix: bracketed_prefix,
};

/// `<json>` only, led by `timestamp`, `channel`, `severity`, `level` and
/// `message`.
pub const PURE_JSON: Variant = Variant {
    name: "pure-json",
    reserved_keys: &[
        "application",
        "channel",
        "level",
        "message",
        "prospectors",
        "severity",
        "timestamp",
        "type",
    ],
    header: pure_json_header,
    prefix: no_prefix,
};

static NULL: Value = Value::Null;

fn var<'a>(vars: &'a Vars, key: &str) -> &'a Value {
    vars.get(key).unwrap_or(&NULL)
}

fn bracketed_header(_: &Stringifier, vars: &Vars) -> Result<Vars, FormatError> {
    let mut header = Map::new();
    header.insert("message".to_string(), var(vars, "message").clone());
    header.insert("level".to_string(), var(vars, "level").clone());
    Ok(header)
}

fn bracketed_prefix(stringifier: &Stringifier, vars: &Vars) -> Result<String, FormatError> {
    Ok(format!(
        "[{}] {}.{}: ",
        stringifier.stringify(var(vars, "datetime"))?,
        stringifier.stringify(var(vars, "channel"))?,
        stringifier.stringify(var(vars, "level_name"))?,
    ))
}

fn pure_json_header(stringifier: &Stringifier, vars: &Vars) -> Result<Vars, FormatError> {
    let mut header = Map::new();
    header.insert(
        "timestamp".to_string(),
        Value::String(stringifier.stringify(var(vars, "datetime"))?),
    );
    header.insert(
        "channel".to_string(),
        Value::String(stringifier.stringify(var(vars, "channel"))?),
    );
    header.insert(
        "severity".to_string(),
        Value::String(stringifier.stringify(var(vars, "level_name"))?),
    );
    header.insert("level".to_string(), var(vars, "level").clone());
    header.insert("message".to_string(), var(vars, "message").clone());
    Ok(header)
}

fn no_prefix(_: &Stringifier, _: &Vars) -> Result<String, FormatError> {
    Ok(String::new())
}

/// Selects one of the built-in variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatStyle {
    #[default]
    Bracketed,
    #[serde(alias = "json")]
    PureJson,
}

impl FormatStyle {
    pub fn variant(self) -> Variant {
        match self {
            FormatStyle::Bracketed => BRACKETED,
            FormatStyle::PureJson => PURE_JSON,
        }
    }

    /// Read the style from `LOG_FORMATTER_STYLE`, defaulting to bracketed.
    pub fn from_env() -> Result<Self, FormatError> {
        Self::from_lookup(env_lookup)
    }

    /// Resolve `LOG_FORMATTER_STYLE` through `lookup`; blank means bracketed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FormatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match non_empty(lookup(LOG_FORMATTER_STYLE_ENV)) {
            Some(raw) => raw.parse(),
            None => Ok(FormatStyle::default()),
        }
    }
}

impl FromStr for FormatStyle {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bracketed" => Ok(FormatStyle::Bracketed),
            "pure-json" | "pure_json" | "json" => Ok(FormatStyle::PureJson),
            _ => Err(FormatError::UnknownStyle(s.to_string())),
        }
    }
}

/// Formats [`LogRecord`]s into single newline-terminated lines whose body is
/// the record context as a JSON object.
///
/// The formatter holds only read-only configuration, so one instance can be
/// shared between threads and used concurrently.
#[derive(Clone)]
pub struct ContextFormatter {
    variant: Variant,
    config: FormatterConfig,
    stringifier: Stringifier,
    record_normalizer: Arc<dyn RecordNormalizer>,
}

impl fmt::Debug for ContextFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextFormatter")
            .field("variant", &self.variant)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ContextFormatter {
    /// Create a formatter for one of the built-in styles.
    ///
    /// **Returns**
    /// - `Err(FormatError::InvalidDateFormat)` if `config.date_format` is not
    ///   a valid chrono pattern.
    pub fn new(style: FormatStyle, config: FormatterConfig) -> Result<Self, FormatError> {
        Self::with_variant(style.variant(), config)
    }

    pub fn bracketed(config: FormatterConfig) -> Result<Self, FormatError> {
        Self::new(FormatStyle::Bracketed, config)
    }

    pub fn pure_json(config: FormatterConfig) -> Result<Self, FormatError> {
        Self::new(FormatStyle::PureJson, config)
    }

    /// Create a formatter from an arbitrary [`Variant`].
    pub fn with_variant(variant: Variant, config: FormatterConfig) -> Result<Self, FormatError> {
        let record_normalizer = DefaultRecordNormalizer::new(config.date_format.as_deref())?;
        debug!(
            variant = variant.name,
            application = config.application_name(),
            default_category = config.category_default(),
            allow_inline_line_breaks = config.allow_inline_line_breaks,
            "context formatter configured"
        );
        Ok(Self {
            variant,
            stringifier: Stringifier::new(config.allow_inline_line_breaks),
            config,
            record_normalizer: Arc::new(record_normalizer),
        })
    }

    /// Replace the record-to-mapping transform.
    pub fn with_record_normalizer(mut self, normalizer: Arc<dyn RecordNormalizer>) -> Self {
        self.record_normalizer = normalizer;
        self
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    pub fn reserved_keys(&self) -> &'static [&'static str] {
        self.variant.reserved_keys
    }

    /// Format a single record into one line ending in `\n`.
    ///
    /// **Returns**
    /// - `Err(FormatError::InvalidInput)` if the record normalizer did not
    ///   yield a JSON object.
    pub fn format(&self, record: &LogRecord) -> Result<String, FormatError> {
        let vars = match self.record_normalizer.normalize_record(record)? {
            Value::Object(vars) => vars,
            other => {
                return Err(FormatError::InvalidInput {
                    found: type_name(&other),
                })
            }
        };

        let context = match vars.get("context") {
            Some(Value::Object(context)) => context.clone(),
            _ => Map::new(),
        };
        let context = normalize(context, self.variant.reserved_keys);
        let context = self.apply_special_properties(context);

        self.format_context(&vars, context)
    }

    /// Format several records, concatenating their lines.
    pub fn format_batch<'a, I>(&self, records: I) -> Result<String, FormatError>
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let mut out = String::new();
        for record in records {
            out.push_str(&self.format(record)?);
        }
        Ok(out)
    }

    /// Add `application` and the default `category` to a normalized context.
    ///
    /// Keys already present are overwritten in place; new keys are placed
    /// just before the nested `context` entry.
    pub fn apply_special_properties(&self, context: Map<String, Value>) -> Map<String, Value> {
        let mut special = Map::new();
        if let Some(application) = self.config.application_name() {
            special.insert("application".to_string(), Value::String(application.to_string()));
        }
        if !context.contains_key("category") {
            if let Some(category) = self.config.category_default() {
                special.insert("category".to_string(), Value::String(category.to_string()));
            }
        }
        if special.is_empty() {
            return context;
        }

        let mut in_place = Map::new();
        let mut fresh = Vec::new();
        for (key, value) in special {
            if context.contains_key(&key) {
                in_place.insert(key, value);
            } else {
                fresh.push((key, value));
            }
        }

        let mut out = Map::with_capacity(context.len() + fresh.len());
        for (key, value) in context {
            if key == NESTED_KEY {
                out.extend(fresh.drain(..));
            }
            let value = in_place.remove(&key).unwrap_or(value);
            out.insert(key, value);
        }
        // no nested entry to anchor on
        out.extend(fresh);
        out
    }

    fn format_context(&self, vars: &Vars, context: Map<String, Value>) -> Result<String, FormatError> {
        let mut merged = (self.variant.header)(&self.stringifier, vars)?;
        for (key, value) in context {
            merged.insert(key, value);
        }

        let prefix = (self.variant.prefix)(&self.stringifier, vars)?;
        let body = self.stringifier.stringify(&Value::Object(merged))?;
        Ok(format!("{prefix}{body}\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(context: Value) -> LogRecord {
        LogRecord::new("app", Level::Error, "boom")
            .with_datetime(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
            .with_context(context.as_object().cloned().unwrap_or_default())
    }

    fn config() -> FormatterConfig {
        FormatterConfig::new().date_format("%Y-%m-%dT%H:%M:%S")
    }

    #[test]
    fn special_properties_sit_before_context() {
        let formatter =
            ContextFormatter::bracketed(config().application("svc").default_category("ops")).unwrap();
        let out = formatter.apply_special_properties(
            json!({ "user": 1, "context": {} }).as_object().cloned().unwrap(),
        );
        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["user", "application", "category", "context"]);
    }

    #[test]
    fn existing_category_is_kept_in_place() {
        let formatter = ContextFormatter::bracketed(config().default_category("ops")).unwrap();
        let out = formatter.apply_special_properties(
            json!({ "category": "mine", "context": {} }).as_object().cloned().unwrap(),
        );
        assert_eq!(serde_json::to_string(&out).unwrap(), r#"{"category":"mine","context":{}}"#);
    }

    #[test]
    fn bracketed_line_layout() {
        let formatter = ContextFormatter::bracketed(config().application("svc")).unwrap();
        let line = formatter.format(&record(json!({}))).unwrap();
        assert_eq!(
            line,
            "[2023-01-01T00:00:00] app.ERROR: {\"message\":\"boom\",\"level\":400,\"application\":\"svc\",\"context\":{}}\n"
        );
    }

    #[test]
    fn pure_json_line_layout() {
        let formatter = ContextFormatter::pure_json(config().application("svc").default_category("ops")).unwrap();
        let line = formatter.format(&record(json!({}))).unwrap();
        assert_eq!(
            line,
            "{\"timestamp\":\"2023-01-01T00:00:00\",\"channel\":\"app\",\"severity\":\"ERROR\",\"level\":400,\"message\":\"boom\",\"application\":\"svc\",\"category\":\"ops\",\"context\":{}}\n"
        );
    }

    #[test]
    fn styles_parse() {
        assert_eq!("json".parse::<FormatStyle>().unwrap(), FormatStyle::PureJson);
        assert_eq!("Bracketed".parse::<FormatStyle>().unwrap(), FormatStyle::Bracketed);
        assert!(matches!("xml".parse::<FormatStyle>(), Err(FormatError::UnknownStyle(_))));
    }

    #[test]
    fn style_comes_from_lookup() {
        let style = |value: Option<&'static str>| {
            FormatStyle::from_lookup(move |key| {
                assert_eq!(key, LOG_FORMATTER_STYLE_ENV);
                value.map(str::to_string)
            })
        };
        assert_eq!(style(Some("pure-json")).unwrap(), FormatStyle::PureJson);
        assert_eq!(style(Some("bracketed")).unwrap(), FormatStyle::Bracketed);
        assert_eq!(style(None).unwrap(), FormatStyle::Bracketed);
        assert_eq!(style(Some("")).unwrap(), FormatStyle::Bracketed);
        assert!(matches!(style(Some("xml")), Err(FormatError::UnknownStyle(_))));
    }

    #[test]
    fn bad_date_format_fails_construction() {
        assert!(ContextFormatter::pure_json(FormatterConfig::new().date_format("%Q")).is_err());
    }
}
