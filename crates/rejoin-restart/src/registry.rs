use std::collections::HashMap;

use crate::error::{RestartError, RestartResult};
use crate::id::EvaluatorId;
use crate::state::EvaluatorRestartState;

/// The evaluators of the previous driver instance and their restart states.
///
/// The registry is built once per restart episode. The set of evaluators never changes
/// afterwards, and only the state associated with each evaluator is updated.
/// Entries are kept for the lifetime of the episode so that duplicate reports
/// from the same evaluator can be detected.
#[derive(Debug)]
pub struct RestartEvaluatorRegistry {
    evaluators: HashMap<EvaluatorId, EvaluatorRestartState>,
}

impl RestartEvaluatorRegistry {
    /// Creates a registry where every evaluator in the roster is expected to report back.
    pub fn new(roster: impl IntoIterator<Item = EvaluatorId>) -> Self {
        Self {
            evaluators: roster
                .into_iter()
                .map(|id| (id, EvaluatorRestartState::Expected))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    pub fn contains(&self, evaluator_id: &str) -> bool {
        self.evaluators.contains_key(evaluator_id)
    }

    pub fn get(&self, evaluator_id: &str) -> Option<EvaluatorRestartState> {
        self.evaluators.get(evaluator_id).copied()
    }

    pub fn evaluator_ids(&self) -> impl Iterator<Item = &EvaluatorId> {
        self.evaluators.keys()
    }

    pub fn count(&self, state: EvaluatorRestartState) -> usize {
        self.evaluators.values().filter(|s| **s == state).count()
    }

    /// Moves the evaluator to the target state and returns the previous state.
    pub fn transition(
        &mut self,
        evaluator_id: &EvaluatorId,
        to: EvaluatorRestartState,
    ) -> RestartResult<EvaluatorRestartState> {
        let Some(state) = self.evaluators.get_mut(evaluator_id.as_str()) else {
            return Err(RestartError::NotTracked {
                evaluator_id: evaluator_id.clone(),
                state: EvaluatorRestartState::NotExpected,
                to,
            });
        };
        let from = *state;
        if !from.is_legal_transition(to) {
            return Err(RestartError::IllegalTransition {
                evaluator_id: evaluator_id.clone(),
                from,
                to,
            });
        }
        *state = to;
        Ok(from)
    }

    /// Whether any evaluator is still expected to report back.
    pub fn has_outstanding(&self) -> bool {
        self.evaluators
            .values()
            .any(|s| *s == EvaluatorRestartState::Expected)
    }

    /// Returns the evaluators still expected to report back, in sorted order.
    pub fn outstanding(&self) -> Vec<EvaluatorId> {
        let mut ids = self
            .evaluators
            .iter()
            .filter(|(_, s)| **s == EvaluatorRestartState::Expected)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Marks every evaluator still expected to report back as expired,
    /// and returns the expired evaluators in sorted order.
    pub fn expire_outstanding(&mut self) -> Vec<EvaluatorId> {
        let mut ids = vec![];
        for (id, state) in self.evaluators.iter_mut() {
            if *state == EvaluatorRestartState::Expected {
                *state = EvaluatorRestartState::Expired;
                ids.push(id.clone());
            }
        }
        ids.sort();
        ids
    }

    /// Marks an expected evaluator as failed.
    /// Returns `false` if the evaluator is unknown or is no longer expected.
    pub fn mark_failed(&mut self, evaluator_id: &str) -> bool {
        match self.evaluators.get_mut(evaluator_id) {
            Some(state) if *state == EvaluatorRestartState::Expected => {
                *state = EvaluatorRestartState::Failed;
                true
            }
            _ => false,
        }
    }
}
