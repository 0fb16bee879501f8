use std::io::Write;
use std::str::FromStr;

use log::{debug, LevelFilter};
use rejoin_common::config::TelemetryConfig;

use crate::error::{TelemetryError, TelemetryResult};

/// Installs the process-wide logger.
///
/// The `RUST_LOG` environment variable takes precedence over the configured default level.
/// The logger can only be installed once per process.
pub fn init_logging(config: &TelemetryConfig) -> TelemetryResult<()> {
    let default_level = LevelFilter::from_str(&config.default_log_level).map_err(|_| {
        TelemetryError::invalid(format!("log level: {}", config.default_log_level))
    })?;
    let logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.as_str()),
    )
    .format(move |buf, record| {
        let level = record.level();
        let target = record.target();
        let style = buf.default_level_style(level);
        let timestamp = buf.timestamp();
        let args = record.args();
        writeln!(buf, "[{timestamp} {style}{level}{style:#} {target}] {args}")
    })
    .build();
    let max_level = logger.filter();

    log::set_boxed_logger(Box::new(logger)).map_err(|e| TelemetryError::internal(e.to_string()))?;
    log::set_max_level(max_level);
    debug!("logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging() {
        let invalid = TelemetryConfig {
            default_log_level: "loud".to_string(),
        };
        assert!(matches!(
            init_logging(&invalid),
            Err(TelemetryError::InvalidArgument(_))
        ));

        let config = TelemetryConfig {
            default_log_level: "debug".to_string(),
        };
        assert!(init_logging(&config).is_ok());
        // The logger is process-wide and cannot be replaced.
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::InternalError(_))
        ));
    }
}
