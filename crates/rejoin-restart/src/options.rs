//! A dedicated module for restart options to ensure readonly access.
use std::path::PathBuf;
use std::time::Duration;

use rejoin_common::config::{AppConfig, DetectorKind, PreserverKind};
use rejoin_common::error::CommonError;

use crate::error::RestartResult;

#[readonly::make]
#[derive(Debug, Clone)]
pub struct RestartOptions {
    /// The time to wait for the evaluators of the previous driver instance
    /// before the restart is force-completed, or `None` to wait indefinitely.
    pub recovery_timeout: Option<Duration>,
    pub preserver: PreserverOptions,
    pub detector: DetectorOptions,
}

#[derive(Debug, Clone)]
pub enum PreserverOptions {
    Memory,
    File { path: PathBuf },
}

#[derive(Debug, Clone)]
pub enum DetectorOptions {
    Local,
    Container { container_id_env: String },
}

impl RestartOptions {
    pub fn try_new(config: &AppConfig) -> RestartResult<Self> {
        let restart = &config.restart;
        let recovery_timeout = match restart.recovery_timeout_secs {
            0 => None,
            x => Some(Duration::from_secs(x)),
        };
        let preserver = match restart.preserver.kind {
            PreserverKind::Memory => PreserverOptions::Memory,
            PreserverKind::File => {
                let Some(path) = &restart.preserver.path else {
                    return Err(CommonError::missing("restart.preserver.path").into());
                };
                PreserverOptions::File {
                    path: PathBuf::from(path),
                }
            }
        };
        let detector = match restart.detector.kind {
            DetectorKind::Local => DetectorOptions::Local,
            DetectorKind::Container => {
                if restart.detector.container_id_env.is_empty() {
                    return Err(CommonError::invalid(
                        "restart.detector.container_id_env must not be empty",
                    )
                    .into());
                }
                DetectorOptions::Container {
                    container_id_env: restart.detector.container_id_env.clone(),
                }
            }
        };
        Ok(Self {
            recovery_timeout,
            preserver,
            detector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RestartError;

    #[test]
    fn test_default_options() -> RestartResult<()> {
        let options = RestartOptions::try_new(&AppConfig::load_from_toml("")?)?;
        assert_eq!(options.recovery_timeout, None);
        assert!(matches!(options.preserver, PreserverOptions::Memory));
        assert!(matches!(options.detector, DetectorOptions::Local));
        Ok(())
    }

    #[test]
    fn test_file_preserver_options() -> RestartResult<()> {
        let config = AppConfig::load_from_toml(
            r#"
            [restart]
            recovery_timeout_secs = 120

            [restart.preserver]
            kind = "file"
            path = "/tmp/evaluators.log"

            [restart.detector]
            kind = "container"
            container_id_env = "DRIVER_CONTAINER_ID"
            "#,
        )?;
        let options = RestartOptions::try_new(&config)?;
        assert_eq!(options.recovery_timeout, Some(Duration::from_secs(120)));
        assert!(
            matches!(&options.preserver, PreserverOptions::File { path } if path == &PathBuf::from("/tmp/evaluators.log"))
        );
        assert!(
            matches!(&options.detector, DetectorOptions::Container { container_id_env } if container_id_env == "DRIVER_CONTAINER_ID")
        );
        Ok(())
    }

    #[test]
    fn test_file_preserver_requires_path() -> RestartResult<()> {
        let config = AppConfig::load_from_toml(
            r#"
            [restart.preserver]
            kind = "file"
            "#,
        )?;
        let result = RestartOptions::try_new(&config);
        assert!(matches!(
            result,
            Err(RestartError::ConfigError(CommonError::MissingArgument(_)))
        ));
        Ok(())
    }
}
