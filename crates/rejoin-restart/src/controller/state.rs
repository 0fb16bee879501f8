use log::debug;

use crate::controller::completion::PendingCompletion;
use crate::error::{RestartError, RestartResult};
use crate::id::EvaluatorId;
use crate::registry::RestartEvaluatorRegistry;
use crate::state::{DriverRestartPhase, EvaluatorRestartState};

/// The restart phase of the driver together with the evaluators to recover.
/// The two are always read and updated under the same lock.
#[derive(Debug)]
pub(super) struct RestartStatus {
    pub phase: DriverRestartPhase,
    /// The registry exists once the recovery begins.
    pub registry: Option<RestartEvaluatorRegistry>,
}

impl RestartStatus {
    pub fn new() -> Self {
        Self {
            phase: DriverRestartPhase::NotRestarted,
            registry: None,
        }
    }

    pub fn evaluator_state(&self, evaluator_id: &str) -> EvaluatorRestartState {
        if !self.phase.has_restarted() {
            return EvaluatorRestartState::NotExpected;
        }
        self.registry
            .as_ref()
            .and_then(|r| r.get(evaluator_id))
            .unwrap_or(EvaluatorRestartState::NotExpected)
    }

    /// Returns the registry for moving the evaluator to the target state.
    pub fn registry_mut(
        &mut self,
        evaluator_id: &EvaluatorId,
        to: EvaluatorRestartState,
    ) -> RestartResult<&mut RestartEvaluatorRegistry> {
        self.registry
            .as_mut()
            .ok_or_else(|| RestartError::NotTracked {
                evaluator_id: evaluator_id.clone(),
                state: EvaluatorRestartState::NotExpected,
                to,
            })
    }

    /// Marks the restart as completed if the recovery is in progress and either no evaluator
    /// is expected to report back or the recovery has timed out.
    /// The evaluators still expected are marked as expired.
    pub fn try_complete(&mut self, timed_out: bool) -> Option<PendingCompletion> {
        if self.phase != DriverRestartPhase::RestartInProgress {
            return None;
        }
        let registry = self.registry.as_mut()?;
        if !timed_out && registry.has_outstanding() {
            return None;
        }
        let expired_evaluators = registry.expire_outstanding();
        self.phase = DriverRestartPhase::RestartCompleted;
        debug!(
            "driver restart phase changed to {} with {} expired evaluators",
            self.phase,
            expired_evaluators.len()
        );
        Some(PendingCompletion {
            timed_out,
            expired_evaluators,
        })
    }
}
