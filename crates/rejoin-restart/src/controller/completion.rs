use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::RestartResult;
use crate::id::EvaluatorId;

/// The event delivered to the handlers when the driver restart completes.
#[derive(Debug, Clone)]
pub struct DriverRestartCompleted {
    completed_at: DateTime<Utc>,
    timed_out: bool,
    expired_evaluators: Vec<EvaluatorId>,
}

impl DriverRestartCompleted {
    pub(super) fn new(timed_out: bool, expired_evaluators: Vec<EvaluatorId>) -> Self {
        Self {
            completed_at: Utc::now(),
            timed_out,
            expired_evaluators,
        }
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Whether the restart was completed by the recovery timeout rather than
    /// by all the expected evaluators reporting back.
    pub fn is_timed_out(&self) -> bool {
        self.timed_out
    }

    /// The evaluators that were still expected when the restart completed.
    /// These evaluators have been reported as failed.
    pub fn expired_evaluators(&self) -> &[EvaluatorId] {
        &self.expired_evaluators
    }
}

pub trait RestartCompletedHandler: Send + Sync + 'static {
    fn on_restart_completed(&self, event: &DriverRestartCompleted) -> RestartResult<()>;
}

impl<F> RestartCompletedHandler for F
where
    F: Fn(&DriverRestartCompleted) -> RestartResult<()> + Send + Sync + 'static,
{
    fn on_restart_completed(&self, event: &DriverRestartCompleted) -> RestartResult<()> {
        self(event)
    }
}

type HandlerList = Mutex<Vec<Arc<dyn RestartCompletedHandler>>>;

/// Two ordered groups of restart completion handlers.
///
/// Service handlers belong to the driver runtime and must observe the completion
/// before the driver handlers of the application do.
#[derive(Default)]
pub(super) struct CompletionNotifier {
    service_handlers: HandlerList,
    driver_handlers: HandlerList,
}

impl CompletionNotifier {
    pub fn new(
        service_handlers: Vec<Arc<dyn RestartCompletedHandler>>,
        driver_handlers: Vec<Arc<dyn RestartCompletedHandler>>,
    ) -> Self {
        Self {
            service_handlers: Mutex::new(service_handlers),
            driver_handlers: Mutex::new(driver_handlers),
        }
    }

    pub fn add_service_handler(
        &self,
        handler: Arc<dyn RestartCompletedHandler>,
    ) -> RestartResult<()> {
        self.service_handlers.lock()?.push(handler);
        Ok(())
    }

    pub fn add_driver_handler(&self, handler: Arc<dyn RestartCompletedHandler>) -> RestartResult<()> {
        self.driver_handlers.lock()?.push(handler);
        Ok(())
    }

    /// Invokes the service handlers and then the driver handlers.
    /// The first handler error is returned and the remaining handlers are not invoked.
    pub fn notify(&self, event: &DriverRestartCompleted) -> RestartResult<()> {
        // Handlers added during the notification are not invoked for this event.
        let handlers = self.service_handlers.lock()?.clone();
        for handler in handlers {
            handler.on_restart_completed(event)?;
        }
        let handlers = self.driver_handlers.lock()?.clone();
        for handler in handlers {
            handler.on_restart_completed(event)?;
        }
        Ok(())
    }
}

/// The work left after the restart has been marked as completed,
/// which must happen outside the controller lock.
#[derive(Debug)]
pub(super) struct PendingCompletion {
    pub timed_out: bool,
    pub expired_evaluators: Vec<EvaluatorId>,
}
