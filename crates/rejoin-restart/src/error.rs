use std::sync::PoisonError;

use rejoin_common::error::CommonError;
use thiserror::Error;
use tokio::task::JoinError;

use crate::id::EvaluatorId;
use crate::state::{DriverRestartPhase, EvaluatorRestartState};

pub type RestartResult<T> = Result<T, RestartError>;

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("cannot begin recovery since the driver has not restarted")]
    NotRestarting,
    #[error("the evaluators to recover have already been set (driver restart phase: {0})")]
    RecoveryAlreadyStarted(DriverRestartPhase),
    #[error("evaluator {evaluator_id} wants to transition to state [{to}], but is not expected to be alive (state: {state})")]
    NotExpectedAlive {
        evaluator_id: EvaluatorId,
        state: EvaluatorRestartState,
        to: EvaluatorRestartState,
    },
    #[error("evaluator {evaluator_id} wants to transition to state [{to}], but is not tracked for driver restart (state: {state})")]
    NotTracked {
        evaluator_id: EvaluatorId,
        state: EvaluatorRestartState,
        to: EvaluatorRestartState,
    },
    #[error("evaluator {evaluator_id} wants to transition to state [{to}], but is in the illegal state [{from}]")]
    IllegalTransition {
        evaluator_id: EvaluatorId,
        from: EvaluatorRestartState,
        to: EvaluatorRestartState,
    },
    #[error("evaluator {0} is alive but was never recorded as allocated")]
    UnexpectedLiveEvaluator(EvaluatorId),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid evaluator log entry at line {line}: {entry}")]
    InvalidLogEntry { line: usize, entry: String },
    #[error("error in collaborator: {0}")]
    CollaboratorError(String),
    #[error("error in configuration: {0}")]
    ConfigError(#[from] CommonError),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl RestartError {
    pub fn collaborator(message: impl Into<String>) -> Self {
        RestartError::CollaboratorError(message.into())
    }

    /// Whether the error indicates that the in-memory restart model of the driver
    /// has diverged from the cluster manager. There is no local recovery from such errors.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RestartError::NotRestarting
                | RestartError::RecoveryAlreadyStarted(_)
                | RestartError::NotExpectedAlive { .. }
                | RestartError::NotTracked { .. }
                | RestartError::IllegalTransition { .. }
                | RestartError::UnexpectedLiveEvaluator(_)
        )
    }
}

impl From<JoinError> for RestartError {
    fn from(error: JoinError) -> Self {
        RestartError::InternalError(error.to_string())
    }
}

impl<T> From<PoisonError<T>> for RestartError {
    fn from(error: PoisonError<T>) -> Self {
        RestartError::InternalError(error.to_string())
    }
}
