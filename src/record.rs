use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::FormatError;

/// Date format used when none is configured, e.g. `2023-01-01T00:00:00+00:00`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Default nesting limit for context values.
pub const DEFAULT_MAX_DEPTH: usize = 9;

/// Default number of entries kept per object or array.
pub const DEFAULT_MAX_ITEMS: usize = 1000;

/// Log severity with its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Level {
    pub const ALL: [Level; 8] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
        Level::Alert,
        Level::Emergency,
    ];

    pub fn code(self) -> u16 {
        match self {
            Level::Debug => 100,
            Level::Info => 200,
            Level::Notice => 250,
            Level::Warning => 300,
            Level::Error => 400,
            Level::Critical => 500,
            Level::Alert => 550,
            Level::Emergency => 600,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FormatError::UnknownLevel(s.to_string()))
    }
}

impl TryFrom<u16> for Level {
    type Error = FormatError;

    fn try_from(code: u16) -> Result<Self, FormatError> {
        Level::ALL
            .into_iter()
            .find(|level| level.code() == code)
            .ok_or_else(|| FormatError::UnknownLevel(code.to_string()))
    }
}

/// A single log call as handed to the formatter.
///
/// `level` and `level_name` are kept separately so callers may carry codes
/// that do not map onto [`Level`].
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub datetime: DateTime<Utc>,
    pub channel: String,
    pub level: u16,
    pub level_name: String,
    pub message: String,
    pub context: Map<String, Value>,
}

impl LogRecord {
    /// Create a record stamped with the current time and an empty context.
    pub fn new(channel: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            datetime: Utc::now(),
            channel: channel.into(),
            level: level.code(),
            level_name: level.name().to_string(),
            message: message.into(),
            context: Map::new(),
        }
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = datetime;
        self
    }

    /// Override the numeric level and its name, e.g. for custom severities.
    pub fn with_level_code(mut self, level: u16, level_name: impl Into<String>) -> Self {
        self.level = level;
        self.level_name = level_name.into();
        self
    }
}

/// Transforms a [`LogRecord`] into the intermediate "vars" mapping the
/// formatter works on.
///
/// Implementations must yield a JSON object carrying `datetime`, `channel`,
/// `level`, `level_name`, `message` and `context`. Anything else makes
/// [`ContextFormatter::format`](crate::formatter::ContextFormatter::format)
/// fail with [`FormatError::InvalidInput`].
pub trait RecordNormalizer: Send + Sync {
    fn normalize_record(&self, record: &LogRecord) -> Result<Value, FormatError>;
}

/// Standard record transform: formats the datetime and bounds the depth and
/// breadth of context values.
#[derive(Debug, Clone)]
pub struct DefaultRecordNormalizer {
    date_format: String,
    max_depth: usize,
    max_items: usize,
}

impl Default for DefaultRecordNormalizer {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl DefaultRecordNormalizer {
    /// Build a normalizer using a chrono `strftime` pattern for datetimes.
    ///
    /// **Returns**
    /// - `Err(FormatError::InvalidDateFormat)` if the pattern contains an
    ///   unknown specifier.
    pub fn new(date_format: Option<&str>) -> Result<Self, FormatError> {
        let date_format = date_format.unwrap_or(DEFAULT_DATE_FORMAT);
        validate_date_format(date_format)?;
        Ok(Self {
            date_format: date_format.to_string(),
            ..Self::default()
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn format_datetime(&self, datetime: &DateTime<Utc>) -> Result<String, FormatError> {
        let mut out = String::new();
        write!(out, "{}", datetime.format(&self.date_format))
            .map_err(|_| FormatError::InvalidDateFormat(self.date_format.clone()))?;
        Ok(out)
    }

    fn normalize_value(&self, value: &Value, depth: usize) -> Value {
        if depth > self.max_depth {
            return Value::String(format!(
                "Over {} levels deep, aborting normalization",
                self.max_depth
            ));
        }

        match value {
            Value::Object(map) => Value::Object(self.normalize_map(map, depth)),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len().min(self.max_items + 1));
                for (count, item) in items.iter().enumerate() {
                    if count >= self.max_items {
                        out.push(Value::String(self.truncation_notice(items.len())));
                        break;
                    }
                    out.push(self.normalize_value(item, depth + 1));
                }
                Value::Array(out)
            }
            scalar => scalar.clone(),
        }
    }

    fn normalize_map(&self, map: &Map<String, Value>, depth: usize) -> Map<String, Value> {
        let mut out = Map::new();
        for (count, (key, item)) in map.iter().enumerate() {
            if count >= self.max_items {
                out.insert("...".to_string(), Value::String(self.truncation_notice(map.len())));
                break;
            }
            out.insert(key.clone(), self.normalize_value(item, depth + 1));
        }
        out
    }

    fn truncation_notice(&self, total: usize) -> String {
        format!(
            "Over {} items ({} total), aborting normalization",
            self.max_items, total
        )
    }
}

impl RecordNormalizer for DefaultRecordNormalizer {
    fn normalize_record(&self, record: &LogRecord) -> Result<Value, FormatError> {
        let mut vars = Map::new();
        vars.insert("message".to_string(), Value::String(record.message.clone()));
        vars.insert(
            "context".to_string(),
            Value::Object(self.normalize_map(&record.context, 1)),
        );
        vars.insert("level".to_string(), Value::from(record.level));
        vars.insert("level_name".to_string(), Value::String(record.level_name.clone()));
        vars.insert("channel".to_string(), Value::String(record.channel.clone()));
        vars.insert(
            "datetime".to_string(),
            Value::String(self.format_datetime(&record.datetime)?),
        );
        Ok(Value::Object(vars))
    }
}

/// Reject `strftime` patterns chrono cannot render.
pub fn validate_date_format(date_format: &str) -> Result<(), FormatError> {
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        return Err(FormatError::InvalidDateFormat(date_format.to_string()));
    }
    Ok(())
}
