use std::collections::HashSet;

use log::{debug, warn};

use crate::detector::RestartDetector;
use crate::error::RestartResult;
use crate::id::EvaluatorId;

/// The restart detector for drivers hosted in containers whose identity
/// encodes the application attempt, such as YARN containers.
///
/// The driver is a restarted instance if the application attempt is greater than one.
/// If the container identity is unavailable or cannot be parsed, the driver is
/// a restarted instance if the cluster manager reports containers from previous attempts.
#[derive(Debug, Default)]
pub struct ContainerRestartDetector {
    container_id: Option<String>,
    previous_containers: Option<HashSet<EvaluatorId>>,
}

impl ContainerRestartDetector {
    pub fn new(container_id: Option<String>) -> Self {
        Self {
            container_id,
            previous_containers: None,
        }
    }

    /// Creates a detector from the container identity stored in the environment variable.
    pub fn from_env(key: &str) -> Self {
        let container_id = match std::env::var(key) {
            Ok(x) => Some(x),
            Err(e) => {
                warn!("unable to get the container ID from the environment variable {key}: {e}");
                None
            }
        };
        Self::new(container_id)
    }

    /// Sets the containers from previous application attempts that are still alive,
    /// as reported by the cluster manager when the driver registers itself.
    pub fn with_previous_containers(mut self, ids: impl IntoIterator<Item = EvaluatorId>) -> Self {
        self.previous_containers = Some(ids.into_iter().collect());
        self
    }

    fn is_restart_by_previous_containers(&self) -> bool {
        self.previous_containers
            .as_ref()
            .is_some_and(|x| !x.is_empty())
    }
}

impl RestartDetector for ContainerRestartDetector {
    fn is_restart(&self) -> RestartResult<bool> {
        let Some(container_id) = &self.container_id else {
            warn!("container ID is not set, determining restart based on previous containers");
            return Ok(self.is_restart_by_previous_containers());
        };
        let Some(attempt) = parse_application_attempt(container_id) else {
            warn!(
                "unable to get the application attempt from container ID {container_id}, \
                determining restart based on previous containers"
            );
            return Ok(self.is_restart_by_previous_containers());
        };
        debug!("application attempt: {attempt}");
        Ok(attempt > 1)
    }

    /// The previous containers are only reconciled with the roster when the cluster manager
    /// reports at least one of them.
    fn live_evaluators(&self) -> RestartResult<Option<HashSet<EvaluatorId>>> {
        Ok(self
            .previous_containers
            .as_ref()
            .filter(|x| !x.is_empty())
            .cloned())
    }
}

/// Parses the application attempt from a container ID of the form
/// `container_[e<epoch>_]<cluster-timestamp>_<application>_<attempt>_<container>`.
pub fn parse_application_attempt(container_id: &str) -> Option<u32> {
    let mut parts = container_id.split('_');
    if parts.next() != Some("container") {
        return None;
    }
    let mut parts = parts.peekable();
    if parts.peek().is_some_and(|x| x.starts_with('e')) {
        parts.next();
    }
    let parts = parts.collect::<Vec<_>>();
    let [timestamp, application, attempt, container] = parts.as_slice() else {
        return None;
    };
    if [timestamp, application, container]
        .iter()
        .any(|x| x.is_empty() || !x.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    attempt.parse().ok()
}
