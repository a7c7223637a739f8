use crate::config::LoggingSettings;
use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `logging.level`. `logging.format`
/// selects `full` output; anything else is compact.
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| Error::application(format!("Invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if settings.format.eq_ignore_ascii_case("full") {
        builder.try_init()
    } else {
        builder.compact().try_init()
    };

    installed.map_err(|e| Error::application(format!("Failed to install tracing subscriber: {e}")))
}

