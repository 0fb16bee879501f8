use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::task::JoinHandle;

use crate::controller::RestartController;
use crate::error::RestartResult;
use crate::options::RestartOptions;

/// Force-completes the driver restart if the evaluators of the previous driver instance
/// have not all reported back within the recovery timeout.
///
/// The timer runs as a task on the current Tokio runtime. Completion handlers
/// are invoked on a blocking thread since they may block.
pub struct RestartTimer {
    handle: JoinHandle<RestartResult<bool>>,
}

impl RestartTimer {
    /// Starts the timer. This must be called within a Tokio runtime.
    pub fn start(controller: Arc<RestartController>, timeout: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let result = match tokio::task::spawn_blocking(move || controller.force_completion()).await
            {
                Ok(x) => x,
                Err(e) => Err(e.into()),
            };
            match &result {
                Ok(true) => warn!("driver restart completed after timeout of {timeout:?}"),
                Ok(false) => debug!("driver restart is not in progress after timeout"),
                Err(e) => error!("failed to complete driver restart after timeout: {e}"),
            }
            result
        });
        Self { handle }
    }

    /// Starts the timer if a recovery timeout is configured.
    pub fn from_options(
        controller: Arc<RestartController>,
        options: &RestartOptions,
    ) -> Option<Self> {
        options
            .recovery_timeout
            .map(|timeout| Self::start(controller, timeout))
    }

    /// Cancels the timer if it has not fired yet.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Waits for the timer to fire and returns whether the restart was force-completed.
    pub async fn join(self) -> RestartResult<bool> {
        self.handle.await?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::controller::{DriverRestartCompleted, RestartControllerBuilder};
    use crate::detector::FixedRestartDetector;
    use crate::error::RestartError;
    use crate::id::EvaluatorId;
    use crate::preserver::InMemoryEvaluatorPreserver;
    use crate::state::{DriverRestartPhase, EvaluatorRestartState};

    fn restarted_controller(
        ids: &[&str],
        events: Arc<Mutex<Vec<DriverRestartCompleted>>>,
    ) -> RestartResult<Arc<RestartController>> {
        let controller = RestartControllerBuilder::new(
            Arc::new(FixedRestartDetector::new(true)),
            Arc::new(InMemoryEvaluatorPreserver::with_roster(
                ids.iter().map(|x| EvaluatorId::from(*x)),
            )),
        )
        .with_driver_handler(move |event: &DriverRestartCompleted| -> RestartResult<()> {
            events.lock()?.push(event.clone());
            Ok(())
        })
        .build();
        assert!(controller.detect_restart()?);
        controller.begin_recovery()?;
        Ok(Arc::new(controller))
    }

    #[tokio::test]
    async fn test_timer_force_completes_restart() -> RestartResult<()> {
        let events = Arc::new(Mutex::new(vec![]));
        let controller = restarted_controller(&["a", "b"], events.clone())?;
        controller.record_contact(&EvaluatorId::from("a"))?;

        let timer = RestartTimer::start(controller.clone(), Duration::from_millis(10));
        assert!(timer.join().await?);
        assert_eq!(controller.phase(), DriverRestartPhase::RestartCompleted);
        assert_eq!(
            controller.evaluator_state("b"),
            EvaluatorRestartState::Expired
        );
        let events = events.lock()?;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_timed_out());
        assert_eq!(events[0].expired_evaluators(), &[EvaluatorId::from("b")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_timer_after_completion() -> RestartResult<()> {
        let events = Arc::new(Mutex::new(vec![]));
        let controller = restarted_controller(&["a"], events.clone())?;
        controller.record_contact(&EvaluatorId::from("a"))?;

        let timer = RestartTimer::start(controller.clone(), Duration::from_millis(10));
        assert!(!timer.join().await?);
        let events = events.lock()?;
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_timed_out());
        Ok(())
    }

    #[tokio::test]
    async fn test_timer_abort() -> RestartResult<()> {
        let events = Arc::new(Mutex::new(vec![]));
        let controller = restarted_controller(&["a"], events.clone())?;

        let timer = RestartTimer::start(controller.clone(), Duration::from_secs(3600));
        timer.abort();
        assert!(matches!(
            timer.join().await,
            Err(RestartError::InternalError(_))
        ));
        assert_eq!(controller.phase(), DriverRestartPhase::RestartInProgress);
        assert!(events.lock()?.is_empty());
        Ok(())
    }
}
