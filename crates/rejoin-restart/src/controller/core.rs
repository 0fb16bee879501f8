use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};

use crate::controller::completion::{CompletionNotifier, PendingCompletion};
use crate::controller::state::RestartStatus;
use crate::controller::{
    DriverRestartCompleted, IgnoreReason, RestartCompletedHandler, RestartController,
    TransitionOutcome,
};
use crate::detector::RestartDetector;
use crate::error::{RestartError, RestartResult};
use crate::failure::FailureSink;
use crate::id::EvaluatorId;
use crate::preserver::EvaluatorPreserver;
use crate::registry::RestartEvaluatorRegistry;
use crate::state::{DriverRestartPhase, EvaluatorRestartState};

impl RestartController {
    pub(super) fn new(
        detector: Arc<dyn RestartDetector>,
        preserver: Arc<dyn EvaluatorPreserver>,
        failure_sink: Arc<dyn FailureSink>,
        notifier: CompletionNotifier,
    ) -> Self {
        Self {
            detector,
            preserver,
            failure_sink,
            notifier,
            status: Mutex::new(RestartStatus::new()),
            restarted: AtomicBool::new(false),
        }
    }

    /// Sets the restart in motion if the driver is a restarted instance.
    /// Returns whether the driver is a restarted instance, which may have already
    /// completed the restart.
    pub fn detect_restart(&self) -> RestartResult<bool> {
        let mut status = self.status.lock()?;
        if status.phase == DriverRestartPhase::NotRestarted && self.detector.is_restart()? {
            info!("driver restart detected");
            status.phase = DriverRestartPhase::RestartBegan;
            self.restarted.store(true, Ordering::Release);
        }
        Ok(status.phase.has_restarted())
    }

    /// Whether the driver is a restarted instance, regardless of the restart progress.
    pub fn has_restarted(&self) -> bool {
        self.restarted.load(Ordering::Acquire)
    }

    /// Whether the driver is undergoing the restart.
    pub fn is_restarting(&self) -> bool {
        self.phase().is_restarting()
    }

    pub fn phase(&self) -> DriverRestartPhase {
        match self.status.lock() {
            Ok(status) => status.phase,
            Err(e) => e.into_inner().phase,
        }
    }

    /// Recovers the evaluators of the previous driver instance, which are then expected
    /// to report back. This can only be called once after the restart is detected.
    ///
    /// If the cluster manager reports the evaluators that are still alive, the evaluators
    /// that are not alive are reported as failed right away.
    /// The restart completes immediately if no evaluator is expected to report back.
    pub fn begin_recovery(&self) -> RestartResult<()> {
        let (failed, completion) = {
            let mut status = self.status.lock()?;
            match status.phase {
                DriverRestartPhase::RestartBegan => {}
                DriverRestartPhase::NotRestarted => {
                    let e = RestartError::NotRestarting;
                    error!("{e}");
                    return Err(e);
                }
                phase @ (DriverRestartPhase::RestartInProgress
                | DriverRestartPhase::RestartCompleted) => {
                    let e = RestartError::RecoveryAlreadyStarted(phase);
                    error!("{e}");
                    return Err(e);
                }
            }
            let roster = self.preserver.recover_roster()?;
            let mut registry = RestartEvaluatorRegistry::new(roster);
            let failed = match self.detector.live_evaluators()? {
                Some(live) => Self::reconcile_live_evaluators(&mut registry, &live)?,
                None => vec![],
            };
            info!(
                "driver restart in progress with {} evaluators expected to report back and {} failed evaluators",
                registry.count(EvaluatorRestartState::Expected),
                failed.len()
            );
            status.registry = Some(registry);
            status.phase = DriverRestartPhase::RestartInProgress;
            (failed, status.try_complete(false))
        };
        // The handlers run even if the failed evaluators cannot be recorded.
        let reported = self.report_failed_evaluators(&failed);
        let completed = self.complete(completion);
        reported.and(completed)
    }

    fn report_failed_evaluators(&self, failed: &[EvaluatorId]) -> RestartResult<()> {
        for id in failed {
            warn!("evaluator {id} is not alive and must have failed during driver restart");
            self.preserver.record_removed(id)?;
            self.failure_sink.report_failure(
                id,
                &format!("evaluator {id} failed during driver restart"),
            )?;
        }
        Ok(())
    }

    /// Reconciles the roster with the evaluators that the cluster manager considers alive.
    /// Returns the evaluators in the roster that are no longer alive, in sorted order.
    fn reconcile_live_evaluators(
        registry: &mut RestartEvaluatorRegistry,
        live: &HashSet<EvaluatorId>,
    ) -> RestartResult<Vec<EvaluatorId>> {
        let mut unexpected = live
            .iter()
            .filter(|id| !registry.contains(id.as_str()))
            .collect::<Vec<_>>();
        unexpected.sort();
        if let Some(id) = unexpected.first() {
            let e = RestartError::UnexpectedLiveEvaluator((*id).clone());
            error!("{e}");
            return Err(e);
        }
        let mut failed = registry
            .evaluator_ids()
            .filter(|id| !live.contains(id.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        failed.sort();
        for id in failed.iter() {
            registry.mark_failed(id.as_str());
        }
        Ok(failed)
    }

    /// Returns the restart state of the evaluator.
    /// The state is [`EvaluatorRestartState::NotExpected`] if the driver has not restarted
    /// or the evaluator is not from the previous driver instance.
    pub fn evaluator_state(&self, evaluator_id: &str) -> EvaluatorRestartState {
        match self.status.lock() {
            Ok(status) => status.evaluator_state(evaluator_id),
            Err(e) => e.into_inner().evaluator_state(evaluator_id),
        }
    }

    /// Returns the evaluators that are still expected to report back, in sorted order.
    pub fn outstanding_evaluators(&self) -> RestartResult<Vec<EvaluatorId>> {
        let status = self.status.lock()?;
        Ok(status
            .registry
            .as_ref()
            .map(|r| r.outstanding())
            .unwrap_or_default())
    }

    /// Records that an evaluator of the previous driver instance has re-established contact.
    ///
    /// A repeated report from the same evaluator is ignored. A report from an evaluator
    /// that is not expected to be alive is a protocol violation.
    pub fn record_contact(&self, evaluator_id: &EvaluatorId) -> RestartResult<TransitionOutcome> {
        let completion = {
            let mut status = self.status.lock()?;
            let state = status.evaluator_state(evaluator_id.as_str());
            if state.is_failed_or_not_expected() {
                let e = RestartError::NotExpectedAlive {
                    evaluator_id: evaluator_id.clone(),
                    state,
                    to: EvaluatorRestartState::Reported,
                };
                error!("{e}");
                return Err(e);
            }
            if state != EvaluatorRestartState::Expected {
                warn!(
                    "evaluator {evaluator_id} added to the recovered evaluators more than once (state: {state}), ignoring"
                );
                return Ok(TransitionOutcome::Ignored(IgnoreReason::Duplicate(state)));
            }
            status
                .registry_mut(evaluator_id, EvaluatorRestartState::Reported)?
                .transition(evaluator_id, EvaluatorRestartState::Reported)?;
            info!("evaluator {evaluator_id} reported back after driver restart");
            status.try_complete(false)
        };
        self.complete(completion)?;
        Ok(TransitionOutcome::Applied)
    }

    /// Records that the communication channel of the evaluator has been rebound.
    pub fn record_reregistered(
        &self,
        evaluator_id: &EvaluatorId,
    ) -> RestartResult<TransitionOutcome> {
        self.record_transition(evaluator_id, EvaluatorRestartState::Reregistered)
    }

    /// Records that the running task of the evaluator has been recovered.
    pub fn record_task_recovered(
        &self,
        evaluator_id: &EvaluatorId,
    ) -> RestartResult<TransitionOutcome> {
        self.record_transition(evaluator_id, EvaluatorRestartState::Processed)
    }

    /// Records that the evaluator is no longer expected to report back.
    pub fn record_expired(&self, evaluator_id: &EvaluatorId) -> RestartResult<TransitionOutcome> {
        self.record_transition(evaluator_id, EvaluatorRestartState::Expired)
    }

    fn record_transition(
        &self,
        evaluator_id: &EvaluatorId,
        to: EvaluatorRestartState,
    ) -> RestartResult<TransitionOutcome> {
        let completion = {
            let mut status = self.status.lock()?;
            let from = status
                .registry_mut(evaluator_id, to)
                .and_then(|r| r.transition(evaluator_id, to))
                .inspect_err(|e| error!("{e}"))?;
            debug!("evaluator {evaluator_id} changed from {from} to {to}");
            if from == EvaluatorRestartState::Expected {
                status.try_complete(false)
            } else {
                None
            }
        };
        self.complete(completion)?;
        Ok(TransitionOutcome::Applied)
    }

    /// Records an allocated evaluator so that it can be recovered by a future driver instance.
    pub fn record_allocated(&self, evaluator_id: &EvaluatorId) -> RestartResult<()> {
        self.preserver.record_allocated(evaluator_id)
    }

    /// Records a removed evaluator so that it is not recovered by a future driver instance.
    pub fn record_removed(&self, evaluator_id: &EvaluatorId) -> RestartResult<()> {
        self.preserver.record_removed(evaluator_id)
    }

    /// Completes the restart without waiting for the remaining evaluators.
    /// The evaluators still expected are marked as expired and reported as failed.
    /// Returns `false` if the recovery is not in progress.
    pub fn force_completion(&self) -> RestartResult<bool> {
        let completion = {
            let mut status = self.status.lock()?;
            status.try_complete(true)
        };
        let completed = completion.is_some();
        self.complete(completion)?;
        Ok(completed)
    }

    /// Adds a handler of the driver runtime to be invoked when the restart completes.
    /// Service handlers are invoked before driver handlers.
    pub fn add_service_completion_handler(
        &self,
        handler: impl RestartCompletedHandler,
    ) -> RestartResult<()> {
        self.notifier.add_service_handler(Arc::new(handler))
    }

    /// Adds a handler of the application to be invoked when the restart completes.
    pub fn add_driver_completion_handler(
        &self,
        handler: impl RestartCompletedHandler,
    ) -> RestartResult<()> {
        self.notifier.add_driver_handler(Arc::new(handler))
    }

    /// Reports the expired evaluators and notifies the handlers.
    /// This must be called without holding the status lock so that the handlers
    /// can call back into the controller.
    ///
    /// The handlers are notified even if an expired evaluator cannot be reported,
    /// since the restart has already been marked as completed. The first error is returned.
    fn complete(&self, completion: Option<PendingCompletion>) -> RestartResult<()> {
        let Some(PendingCompletion {
            timed_out,
            expired_evaluators,
        }) = completion
        else {
            return Ok(());
        };
        let mut reported = Ok(());
        for id in expired_evaluators.iter() {
            let result = self.failure_sink.report_failure(
                id,
                &format!("evaluator {id} did not report back during driver restart"),
            );
            if let Err(e) = result {
                error!("failed to report expired evaluator {id}: {e}");
                reported = reported.and(Err(e));
            }
        }
        info!(
            "driver restart completed (timed out: {timed_out}), evaluators that have not reported back: {expired_evaluators:?}"
        );
        let event = DriverRestartCompleted::new(timed_out, expired_evaluators);
        let notified = self.notifier.notify(&event);
        reported.and(notified)
    }
}
