use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::RestartResult;
use crate::id::EvaluatorId;
use crate::preserver::EvaluatorPreserver;

/// An evaluator preserver that does not survive the driver process.
/// The roster can be seeded when the evaluators are tracked elsewhere.
#[derive(Debug, Default)]
pub struct InMemoryEvaluatorPreserver {
    evaluators: Mutex<HashSet<EvaluatorId>>,
}

impl InMemoryEvaluatorPreserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(ids: impl IntoIterator<Item = EvaluatorId>) -> Self {
        Self {
            evaluators: Mutex::new(ids.into_iter().collect()),
        }
    }
}

impl EvaluatorPreserver for InMemoryEvaluatorPreserver {
    fn recover_roster(&self) -> RestartResult<HashSet<EvaluatorId>> {
        Ok(self.evaluators.lock()?.clone())
    }

    fn record_allocated(&self, id: &EvaluatorId) -> RestartResult<()> {
        self.evaluators.lock()?.insert(id.clone());
        Ok(())
    }

    fn record_removed(&self, id: &EvaluatorId) -> RestartResult<()> {
        self.evaluators.lock()?.remove(id.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_preserver() -> RestartResult<()> {
        let preserver = InMemoryEvaluatorPreserver::with_roster(vec![EvaluatorId::from("a")]);
        preserver.record_allocated(&EvaluatorId::from("b"))?;
        preserver.record_removed(&EvaluatorId::from("a"))?;
        preserver.record_removed(&EvaluatorId::from("z"))?;
        assert_eq!(
            preserver.recover_roster()?,
            HashSet::from([EvaluatorId::from("b")])
        );
        Ok(())
    }
}
