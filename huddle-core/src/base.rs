//! Core abstractions shared by the request path and the optimizers.
mod barrier;
mod learner;
mod session;

pub use barrier::{TrainingBarrier, TrainingPermit};
pub use learner::{ChosenAction, Learner, Transition};
pub use session::{AgentSession, SessionTable};
