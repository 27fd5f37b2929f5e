//! The configured learner variant.
use anyhow::Result;
use huddle_core::{record::Record, ChosenAction, Learner, Transition};
use huddle_candle_agent::{
    dqn::{DqnConfig, DqnLearner},
    mlp::{Mlp, MlpConfig},
    ppo::{PpoConfig, PpoLearner},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which optimizer a deployment runs, with its settings.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum LearnerConfig {
    /// On-policy clipped policy gradient.
    Ppo(PpoConfig<MlpConfig, MlpConfig>),

    /// Replay Q-learning.
    Dqn(DqnConfig<MlpConfig>),
}

impl LearnerConfig {
    /// Builds the configured learner.
    pub fn build(&self) -> Result<AnyLearner> {
        match self {
            Self::Ppo(config) => Ok(AnyLearner::Ppo(PpoLearner::build(config.clone())?)),
            Self::Dqn(config) => Ok(AnyLearner::Dqn(DqnLearner::build(config.clone())?)),
        }
    }
}

/// Either learner variant behind one [`Learner`] object.
pub enum AnyLearner {
    /// On-policy clipped policy gradient.
    Ppo(PpoLearner<Mlp, Mlp>),

    /// Replay Q-learning.
    Dqn(DqnLearner<Mlp>),
}

impl Learner for AnyLearner {
    fn n_actions(&self) -> usize {
        match self {
            Self::Ppo(l) => l.n_actions(),
            Self::Dqn(l) => l.n_actions(),
        }
    }

    fn obs_dim(&self) -> usize {
        match self {
            Self::Ppo(l) => l.obs_dim(),
            Self::Dqn(l) => l.obs_dim(),
        }
    }

    fn choose_action(&mut self, obs: &[f32]) -> Result<ChosenAction> {
        match self {
            Self::Ppo(l) => l.choose_action(obs),
            Self::Dqn(l) => l.choose_action(obs),
        }
    }

    fn observe(&mut self, tr: Transition) -> Result<()> {
        match self {
            Self::Ppo(l) => l.observe(tr),
            Self::Dqn(l) => l.observe(tr),
        }
    }

    fn n_transitions(&self) -> usize {
        match self {
            Self::Ppo(l) => l.n_transitions(),
            Self::Dqn(l) => l.n_transitions(),
        }
    }

    fn learn(&mut self) -> Result<Option<Record>> {
        match self {
            Self::Ppo(l) => l.learn(),
            Self::Dqn(l) => l.learn(),
        }
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        match self {
            Self::Ppo(l) => l.save_params(path),
            Self::Dqn(l) => l.save_params(path),
        }
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        match self {
            Self::Ppo(l) => l.load_params(path),
            Self::Dqn(l) => l.load_params(path),
        }
    }
}
