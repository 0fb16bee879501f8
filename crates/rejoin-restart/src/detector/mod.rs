mod container;
mod fixed;
mod local;

use std::collections::HashSet;

pub use container::{parse_application_attempt, ContainerRestartDetector};
pub use fixed::FixedRestartDetector;
pub use local::LocalRestartDetector;

use crate::error::RestartResult;
use crate::id::EvaluatorId;

/// Determines whether the driver process is a restarted instance.
/// The implementation depends on the cluster manager.
pub trait RestartDetector: Send + Sync + 'static {
    /// Whether the driver process is a restarted instance.
    fn is_restart(&self) -> RestartResult<bool>;

    /// The evaluators that the cluster manager still considers alive after the restart.
    ///
    /// Cluster managers that do not report previous containers return `None`,
    /// in which case every evaluator in the roster is expected to report back.
    /// Otherwise, the evaluators in the roster that are not alive are reported
    /// as failed when the recovery begins.
    fn live_evaluators(&self) -> RestartResult<Option<HashSet<EvaluatorId>>> {
        Ok(None)
    }
}
