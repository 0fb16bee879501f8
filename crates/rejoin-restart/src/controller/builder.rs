use std::sync::Arc;

use crate::controller::completion::CompletionNotifier;
use crate::controller::{RestartCompletedHandler, RestartController};
use crate::detector::{ContainerRestartDetector, LocalRestartDetector, RestartDetector};
use crate::failure::{FailureSink, LoggingFailureSink};
use crate::options::{DetectorOptions, PreserverOptions, RestartOptions};
use crate::preserver::{EvaluatorPreserver, FileEvaluatorPreserver, InMemoryEvaluatorPreserver};

pub struct RestartControllerBuilder {
    detector: Arc<dyn RestartDetector>,
    preserver: Arc<dyn EvaluatorPreserver>,
    failure_sink: Arc<dyn FailureSink>,
    service_handlers: Vec<Arc<dyn RestartCompletedHandler>>,
    driver_handlers: Vec<Arc<dyn RestartCompletedHandler>>,
}

impl RestartControllerBuilder {
    pub fn new(detector: Arc<dyn RestartDetector>, preserver: Arc<dyn EvaluatorPreserver>) -> Self {
        Self {
            detector,
            preserver,
            failure_sink: Arc::new(LoggingFailureSink::new()),
            service_handlers: vec![],
            driver_handlers: vec![],
        }
    }

    /// Creates the builder with the collaborators chosen by the options.
    pub fn from_options(options: &RestartOptions) -> Self {
        let detector: Arc<dyn RestartDetector> = match &options.detector {
            DetectorOptions::Local => Arc::new(LocalRestartDetector::new()),
            DetectorOptions::Container { container_id_env } => {
                Arc::new(ContainerRestartDetector::from_env(container_id_env))
            }
        };
        let preserver: Arc<dyn EvaluatorPreserver> = match &options.preserver {
            PreserverOptions::Memory => Arc::new(InMemoryEvaluatorPreserver::new()),
            PreserverOptions::File { path } => Arc::new(FileEvaluatorPreserver::new(path)),
        };
        Self::new(detector, preserver)
    }

    pub fn with_detector(mut self, detector: Arc<dyn RestartDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_failure_sink(mut self, failure_sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = failure_sink;
        self
    }

    pub fn with_service_handler(mut self, handler: impl RestartCompletedHandler) -> Self {
        self.service_handlers.push(Arc::new(handler));
        self
    }

    pub fn with_driver_handler(mut self, handler: impl RestartCompletedHandler) -> Self {
        self.driver_handlers.push(Arc::new(handler));
        self
    }

    pub fn build(self) -> RestartController {
        RestartController::new(
            self.detector,
            self.preserver,
            self.failure_sink,
            CompletionNotifier::new(self.service_handlers, self.driver_handlers),
        )
    }
}
