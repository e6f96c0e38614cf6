//! Logging setup built on `tracing` and `tracing-subscriber`.
//!
//! ```rust,ignore
//! let config = hearth_runtime::config::load()?;
//! hearth_runtime::logging::init(&config.logging);
//! ```

use std::ffi::OsStr;
use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig};

/// Initializes the global tracing subscriber from configuration.
///
/// Idempotent: a second call leaves the first subscriber installed.
pub fn init(config: &LoggingConfig) {
    let _ = try_init(config);
}

/// Like [`init`] but surfaces the failure when a subscriber is
/// already installed.
pub fn try_init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = build_filter(config);

    macro_rules! init_with_writer {
        ($writer:expr) => {
            match config.format {
                LogFormat::Compact => tracing_subscriber::registry()
                    .with(fmt::layer().compact().with_writer($writer))
                    .with(filter)
                    .try_init(),
                LogFormat::Full => tracing_subscriber::registry()
                    .with(fmt::layer().with_writer($writer))
                    .with(filter)
                    .try_init(),
            }
        };
    }

    match config.output {
        LogOutput::Stdout => init_with_writer!(std::io::stdout),
        LogOutput::Stderr => init_with_writer!(std::io::stderr),
        LogOutput::File => {
            let path = config.file_path.clone().unwrap_or_else(|| "hearth.log".into());
            let appender = tracing_appender::rolling::never(
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_else(|| OsStr::new("hearth.log")),
            );
            init_with_writer!(appender)
        }
    }
}

/// `RUST_LOG` wins over the configured level when set.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn repeated_init_does_not_panic() {
        let config = LoggingConfig::default();
        init(&config);
        init(&config);
    }
}
