mod file;
mod memory;

use std::collections::HashSet;

pub use file::FileEvaluatorPreserver;
pub use memory::InMemoryEvaluatorPreserver;

use crate::error::RestartResult;
use crate::id::EvaluatorId;

/// A durable record of the evaluators allocated to the driver.
///
/// The record is maintained during normal operation so that a future driver
/// instance can recover the set of evaluators that are expected to be alive.
pub trait EvaluatorPreserver: Send + Sync + 'static {
    /// Returns the evaluators that have been allocated but not removed,
    /// as of the last successful write.
    fn recover_roster(&self) -> RestartResult<HashSet<EvaluatorId>>;

    fn record_allocated(&self, id: &EvaluatorId) -> RestartResult<()>;

    fn record_removed(&self, id: &EvaluatorId) -> RestartResult<()>;
}
