mod builder;
mod completion;
mod core;
mod state;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

pub use builder::RestartControllerBuilder;
pub use completion::{DriverRestartCompleted, RestartCompletedHandler};

use crate::controller::completion::CompletionNotifier;
use crate::controller::state::RestartStatus;
use crate::detector::RestartDetector;
use crate::failure::FailureSink;
use crate::preserver::EvaluatorPreserver;
use crate::state::EvaluatorRestartState;

/// The controller that handles the driver restart: whether the driver is a restarted instance,
/// which evaluators of the previous instance are expected to report back,
/// and when the restart is completed.
///
/// There is a single controller per driver process, shared by the components
/// that observe evaluators reporting back. All operations can be called concurrently.
pub struct RestartController {
    detector: Arc<dyn RestartDetector>,
    preserver: Arc<dyn EvaluatorPreserver>,
    failure_sink: Arc<dyn FailureSink>,
    notifier: CompletionNotifier,
    status: Mutex<RestartStatus>,
    /// Whether the driver has restarted, which can be read without the status lock.
    /// It is only set while holding the status lock.
    restarted: AtomicBool,
}

/// The result of recording an evaluator event that is not a protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The evaluator moved to the new state.
    Applied,
    /// The event was ignored and the evaluator state is unchanged.
    Ignored(IgnoreReason),
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The evaluator has already reported back and is in the given state.
    Duplicate(EvaluatorRestartState),
}
