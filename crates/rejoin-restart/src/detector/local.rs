use crate::detector::RestartDetector;
use crate::error::RestartResult;

/// The restart detector for drivers running as local processes.
/// A local driver is never restarted by the process manager.
#[derive(Debug, Default)]
pub struct LocalRestartDetector;

impl LocalRestartDetector {
    pub fn new() -> Self {
        Self
    }
}

impl RestartDetector for LocalRestartDetector {
    fn is_restart(&self) -> RestartResult<bool> {
        Ok(false)
    }
}
