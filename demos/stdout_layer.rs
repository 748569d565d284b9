use json_context_formatter::init::{init_tracing_with_config, LayerConfig};
use json_context_formatter::{ContextFormatter, FormatStyle, FormatterConfig};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let style = FormatStyle::from_env()?;
    let formatter = ContextFormatter::new(
        style,
        FormatterConfig::new().application("auth-service").default_category("auth"),
    )?;

    init_tracing_with_config(
        formatter,
        LayerConfig {
            channel: Some("auth".to_string()),
            max_level: LevelFilter::INFO,
        },
    )?;

    info!("starting service");
    warn!(category = "security", attempts = 5, "too many login attempts");
    error!(user_id = 42, reason = "invalid password", "authentication failed");

    Ok(())
}
