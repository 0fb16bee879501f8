pub mod controller;
pub mod detector;
pub mod error;
pub mod failure;
mod id;
pub mod options;
pub mod preserver;
mod registry;
mod state;
pub mod timer;

pub use controller::{
    DriverRestartCompleted, IgnoreReason, RestartCompletedHandler, RestartController,
    RestartControllerBuilder, TransitionOutcome,
};
pub use id::EvaluatorId;
pub use registry::RestartEvaluatorRegistry;
pub use state::{DriverRestartPhase, EvaluatorRestartState};
