use std::collections::HashSet;

use crate::detector::RestartDetector;
use crate::error::RestartResult;
use crate::id::EvaluatorId;

/// A restart detector with a predetermined answer.
/// This is useful when the restart information is obtained by the embedding application.
#[derive(Debug, Default)]
pub struct FixedRestartDetector {
    restart: bool,
    live_evaluators: Option<HashSet<EvaluatorId>>,
}

impl FixedRestartDetector {
    pub fn new(restart: bool) -> Self {
        Self {
            restart,
            live_evaluators: None,
        }
    }

    pub fn with_live_evaluators(mut self, ids: impl IntoIterator<Item = EvaluatorId>) -> Self {
        self.live_evaluators = Some(ids.into_iter().collect());
        self
    }
}

impl RestartDetector for FixedRestartDetector {
    fn is_restart(&self) -> RestartResult<bool> {
        Ok(self.restart)
    }

    fn live_evaluators(&self) -> RestartResult<Option<HashSet<EvaluatorId>>> {
        Ok(self.live_evaluators.clone())
    }
}
