use log::warn;

use crate::error::RestartResult;
use crate::id::EvaluatorId;

/// Receives failures of evaluators from the previous driver instance that will
/// never report back. Each failure becomes a resource failure event for the evaluator.
///
/// Failures are delivered at least once, so the implementation must tolerate
/// duplicate reports for the same evaluator.
pub trait FailureSink: Send + Sync + 'static {
    fn report_failure(&self, id: &EvaluatorId, reason: &str) -> RestartResult<()>;
}

/// A failure sink that only logs the failures.
#[derive(Debug, Default)]
pub struct LoggingFailureSink;

impl LoggingFailureSink {
    pub fn new() -> Self {
        Self
    }
}

impl FailureSink for LoggingFailureSink {
    fn report_failure(&self, id: &EvaluatorId, reason: &str) -> RestartResult<()> {
        warn!("evaluator {id} failed during driver restart: {reason}");
        Ok(())
    }
}
