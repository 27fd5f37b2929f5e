//! The learner contract.
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// An action chosen by a learner, with the auxiliary outputs that must be
/// cached until the next observation arrives for the same agent.
///
/// For the clipped-policy-gradient learner, `log_prob` and `value` are the
/// log-probability of the sampled action and the state-value estimate. The
/// Q-learning learner has no auxiliary outputs and leaves both at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChosenAction {
    /// Discrete action index.
    pub act: usize,

    /// Log-probability of the sampled action under the current policy.
    pub log_prob: f32,

    /// Value estimate of the observed state.
    pub value: f32,
}

/// One experience tuple, created when a new observation arrives for an
/// agent that already had a cached action.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observation the cached action was chosen for.
    pub obs: Vec<f32>,

    /// The cached action.
    pub act: usize,

    /// Log-probability cached with the action.
    pub log_prob: f32,

    /// Value estimate cached with the action.
    pub value: f32,

    /// Shaped reward for this step.
    pub reward: f32,

    /// Whether the episode ended on this step.
    pub is_done: bool,

    /// The observation that followed. Only the Q-learning variant reads it.
    pub next_obs: Vec<f32>,
}

/// A trainable policy fed by concurrently arriving transitions.
///
/// Implementations own their transition store; [`Learner::observe`] appends
/// to it and [`Learner::learn`] consumes it. A learner is always driven
/// from behind a single lock, so no method needs to be re-entrant.
pub trait Learner {
    /// Size of the discrete action space.
    fn n_actions(&self) -> usize;

    /// Length of the observation vector.
    fn obs_dim(&self) -> usize;

    /// Samples an action for the given observation.
    fn choose_action(&mut self, obs: &[f32]) -> Result<ChosenAction>;

    /// Appends a transition to the learner's store.
    fn observe(&mut self, tr: Transition) -> Result<()>;

    /// Number of transitions currently stored.
    fn n_transitions(&self) -> usize;

    /// Performs one optimization pass.
    ///
    /// Returns `None` when the pass was skipped because too little data has
    /// been collected. An `Err` aborts the pass; implementations must leave
    /// their store intact in that case so the pass can be retried.
    fn learn(&mut self) -> Result<Option<Record>>;

    /// Saves the learner's parameters in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Loads the learner's parameters from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
