//! Errors surfaced to request handlers.
use thiserror::Error;

/// Errors in the library.
///
/// The variants fall into the three recoverable classes seen at the HTTP
/// edge: malformed requests, unmet preconditions, and learner failures.
/// Learner failures abort the current training pass but leave the
/// transition store intact for a retry.
#[derive(Error, Debug)]
pub enum HuddleError {
    /// The observation vector has the wrong number of components.
    #[error("observation has {got} components, expected {expected}")]
    ObservationLength {
        /// Number of components the learner was built for.
        expected: usize,
        /// Number of components received.
        got: usize,
    },

    /// A named observation component required by the deployment is missing.
    #[error("observation is missing component {0:?}")]
    MissingObservation(String),

    /// An observation component is NaN or infinite.
    #[error("observation component {0} is not a finite number")]
    ObservationNotFinite(usize),

    /// An optimization pass is running; the caller should retry later.
    #[error("training in progress, retry later")]
    TrainingInProgress,

    /// Training was requested before the admission precondition was met.
    #[error("Model is not ready to train")]
    NotReadyToTrain,

    /// The configured action table does not match the learner's action space.
    #[error("action table defines {table} actions, the learner expects {learner}")]
    ActionSpaceMismatch {
        /// Number of entries in the action table.
        table: usize,
        /// Action-space size of the learner.
        learner: usize,
    },

    /// Failure inside the learner, e.g. a non-finite loss.
    #[error(transparent)]
    Learner(#[from] anyhow::Error),
}
