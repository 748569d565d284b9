pub mod config;
pub mod env;
pub mod error;
pub mod formatter;
pub mod normalizer;
pub mod record;
pub mod stringify;

#[cfg(feature = "layer")]
pub mod layer;

#[cfg(feature = "layer")]
pub mod init;

pub use config::FormatterConfig;
pub use error::FormatError;
pub use formatter::{ContextFormatter, FormatStyle, Variant, BRACKETED, PURE_JSON};
pub use normalizer::normalize;
pub use record::{DefaultRecordNormalizer, Level, LogRecord, RecordNormalizer};
