use crate::formatter::ContextFormatter;
use crate::layer::ContextFormatLayer;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// Конфигурация слоя форматирования.
///
/// **Поля**
/// - `channel`: фиксированное имя канала для всех записей; если `None`,
///   используется `target` события.
/// - `max_level`: самый подробный уровень, который ещё попадает в вывод.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel: Option<String>,
    pub max_level: LevelFilter,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel: None,
            max_level: LevelFilter::INFO,
        }
    }
}

/// Error returned when the global subscriber cannot be installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),
}

/// Initialize global `tracing` subscriber that prints every event to
/// stdout as one formatted line.
///
/// **Parameters**
/// - `formatter`: the [`ContextFormatter`] producing the lines.
/// - `config`: [`LayerConfig`] selecting channel and level filter.
///
/// **Returns**
/// - `Err(InitError)` if a global subscriber was already set.
pub fn init_tracing_with_config(
    formatter: ContextFormatter,
    config: LayerConfig,
) -> Result<(), InitError> {
    let mut layer = ContextFormatLayer::new(formatter, std::io::stdout);
    if let Some(channel) = config.channel {
        layer = layer.with_channel(channel);
    }

    let subscriber = Registry::default().with(layer.with_filter(config.max_level));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing(formatter: ContextFormatter) -> Result<(), InitError> {
    init_tracing_with_config(formatter, LayerConfig::default())
}
