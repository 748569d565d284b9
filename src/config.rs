use serde::Deserialize;

use crate::env::{
    env_lookup, non_empty, parse_flag, LOG_FORMATTER_ALLOW_INLINE_LINE_BREAKS_ENV,
    LOG_FORMATTER_APPLICATION_ENV, LOG_FORMATTER_DATE_FORMAT_ENV,
    LOG_FORMATTER_DEFAULT_CATEGORY_ENV,
};
use crate::error::FormatError;

/// Construction-time options of a [`ContextFormatter`](crate::formatter::ContextFormatter).
///
/// **Fields**
/// - `date_format`: chrono `strftime` pattern for the record datetime;
///   `None` uses [`DEFAULT_DATE_FORMAT`](crate::record::DEFAULT_DATE_FORMAT).
/// - `application`: written as `application` into every line, replacing
///   whatever the context held.
/// - `default_category`: written as `category` when the context has none.
/// - `allow_inline_line_breaks`: if `false` (default) every line break in
///   rendered text becomes a space; if `true` JSON escapes `\n`/`\r` in
///   object output are expanded into real breaks.
///
/// Empty strings for `application` and `default_category` count as unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    pub date_format: Option<String>,
    pub application: Option<String>,
    pub default_category: Option<String>,
    pub allow_inline_line_breaks: bool,
}

impl FormatterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = Some(date_format.into());
        self
    }

    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = Some(category.into());
        self
    }

    pub fn allow_inline_line_breaks(mut self, allow: bool) -> Self {
        self.allow_inline_line_breaks = allow;
        self
    }

    /// Build a config from `LOG_FORMATTER_*` environment variables.
    ///
    /// **Returns**
    /// - `Err(FormatError::InvalidEnvValue)` if the line-break flag is set
    ///   to something other than a recognised boolean.
    pub fn from_env() -> Result<Self, FormatError> {
        Self::from_lookup(env_lookup)
    }

    /// Build a config from `LOG_FORMATTER_*` keys resolved by `lookup`.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FormatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| non_empty(lookup(key));
        let allow_inline_line_breaks = match read(LOG_FORMATTER_ALLOW_INLINE_LINE_BREAKS_ENV) {
            Some(raw) => parse_flag(&raw).ok_or(FormatError::InvalidEnvValue {
                key: LOG_FORMATTER_ALLOW_INLINE_LINE_BREAKS_ENV,
                value: raw,
            })?,
            None => false,
        };

        Ok(Self {
            date_format: read(LOG_FORMATTER_DATE_FORMAT_ENV),
            application: read(LOG_FORMATTER_APPLICATION_ENV),
            default_category: read(LOG_FORMATTER_DEFAULT_CATEGORY_ENV),
            allow_inline_line_breaks,
        })
    }

    /// The application name, if configured and non-empty.
    pub fn application_name(&self) -> Option<&str> {
        self.application.as_deref().filter(|name| !name.is_empty())
    }

    /// The default category, if configured and non-empty.
    pub fn category_default(&self) -> Option<&str> {
        self.default_category.as_deref().filter(|name| !name.is_empty())
    }
}
