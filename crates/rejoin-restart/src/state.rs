use std::fmt;
use std::fmt::Formatter;

/// The restart progress of the driver process.
///
/// The phase only moves forward, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverRestartPhase {
    /// The driver has not begun the restart process.
    NotRestarted,
    /// The cluster manager reported a restart, but the evaluators to recover
    /// have not been received yet.
    RestartBegan,
    /// The evaluators to recover have been received and are expected to report back.
    RestartInProgress,
    /// The driver has recovered all the evaluators that it can.
    RestartCompleted,
}

impl DriverRestartPhase {
    /// Whether the driver is a restarted instance, regardless of the restart progress.
    pub fn has_restarted(&self) -> bool {
        !matches!(self, DriverRestartPhase::NotRestarted)
    }

    pub fn is_restarting(&self) -> bool {
        matches!(
            self,
            DriverRestartPhase::RestartBegan | DriverRestartPhase::RestartInProgress
        )
    }
}

impl fmt::Display for DriverRestartPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DriverRestartPhase::NotRestarted => write!(f, "NOT_RESTARTED"),
            DriverRestartPhase::RestartBegan => write!(f, "RESTART_BEGAN"),
            DriverRestartPhase::RestartInProgress => write!(f, "RESTART_IN_PROGRESS"),
            DriverRestartPhase::RestartCompleted => write!(f, "RESTART_COMPLETED"),
        }
    }
}

/// The restart state of an evaluator from the previous driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluatorRestartState {
    /// The evaluator is not part of the restart. This state is never stored.
    NotExpected,
    /// The evaluator is expected to report back to the driver.
    Expected,
    /// The evaluator has re-established contact with the driver.
    Reported,
    /// The communication channel of the evaluator has been rebound.
    Reregistered,
    /// The running task of the evaluator has been recovered.
    Processed,
    /// The evaluator did not report back before the restart completed.
    Expired,
    /// The cluster manager no longer considers the evaluator alive.
    Failed,
}

impl EvaluatorRestartState {
    pub fn is_failed_or_not_expected(&self) -> bool {
        matches!(
            self,
            EvaluatorRestartState::NotExpected
                | EvaluatorRestartState::Failed
                | EvaluatorRestartState::Expired
        )
    }

    /// Whether the evaluator may move from this state to the target state.
    /// Evaluators only move forward through the recovery milestones.
    /// [`EvaluatorRestartState::Failed`] is never a legal target since it is only
    /// assigned when the roster is reconciled with the cluster manager.
    pub fn is_legal_transition(&self, to: EvaluatorRestartState) -> bool {
        use EvaluatorRestartState::*;

        matches!(
            (self, to),
            (Expected, Reported | Reregistered | Processed | Expired)
                | (Reported, Reregistered | Processed)
                | (Reregistered, Processed)
        )
    }
}

impl fmt::Display for EvaluatorRestartState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatorRestartState::NotExpected => write!(f, "NOT_EXPECTED"),
            EvaluatorRestartState::Expected => write!(f, "EXPECTED"),
            EvaluatorRestartState::Reported => write!(f, "REPORTED"),
            EvaluatorRestartState::Reregistered => write!(f, "REREGISTERED"),
            EvaluatorRestartState::Processed => write!(f, "PROCESSED"),
            EvaluatorRestartState::Expired => write!(f, "EXPIRED"),
            EvaluatorRestartState::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [EvaluatorRestartState; 7] = [
        EvaluatorRestartState::NotExpected,
        EvaluatorRestartState::Expected,
        EvaluatorRestartState::Reported,
        EvaluatorRestartState::Reregistered,
        EvaluatorRestartState::Processed,
        EvaluatorRestartState::Expired,
        EvaluatorRestartState::Failed,
    ];

    #[test]
    fn test_driver_restart_phase() {
        assert!(!DriverRestartPhase::NotRestarted.has_restarted());
        assert!(!DriverRestartPhase::NotRestarted.is_restarting());
        assert!(DriverRestartPhase::RestartBegan.has_restarted());
        assert!(DriverRestartPhase::RestartBegan.is_restarting());
        assert!(DriverRestartPhase::RestartInProgress.is_restarting());
        assert!(DriverRestartPhase::RestartCompleted.has_restarted());
        assert!(!DriverRestartPhase::RestartCompleted.is_restarting());
    }

    #[test]
    fn test_legal_transitions() {
        use EvaluatorRestartState::*;

        let legal = [
            (Expected, Reported),
            (Expected, Reregistered),
            (Expected, Processed),
            (Expected, Expired),
            (Reported, Reregistered),
            (Reported, Processed),
            (Reregistered, Processed),
        ];
        for from in ALL_STATES {
            for to in ALL_STATES {
                assert_eq!(
                    from.is_legal_transition(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_failed_or_not_expected() {
        let failed = ALL_STATES
            .iter()
            .filter(|s| s.is_failed_or_not_expected())
            .copied()
            .collect::<Vec<_>>();
        assert_eq!(
            failed,
            vec![
                EvaluatorRestartState::NotExpected,
                EvaluatorRestartState::Expired,
                EvaluatorRestartState::Failed,
            ]
        );
    }
}
