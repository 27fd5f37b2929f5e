//! Deployment configuration.
use crate::{
    actions::ActionTable,
    learner::{AnyLearner, LearnerConfig},
};
use anyhow::Result;
use huddle_candle_agent::{mlp::MlpConfig, ppo::PpoConfig};
use huddle_core::{error::HuddleError, reward::RewardShaping, CoordinatorConfig, Learner};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of the server and everything behind it.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Number of request-handling threads.
    pub workers: usize,

    /// Names of the observation components, in the order they form the
    /// observation vector. The first is the progress fraction and the
    /// second the steering angle by reward-shaping convention.
    pub observation_keys: Vec<String>,

    /// Mapping from action indices to named boolean flags.
    pub actions: ActionTable,

    /// Reward shaping constants.
    pub reward: RewardShaping,

    /// Training-cycle configuration (model directory, save interval).
    pub coordinator: CoordinatorConfig,

    /// The optimizer variant and its settings.
    pub learner: LearnerConfig,
}

impl Default for ServerConfig {
    /// The racing deployment: eight observation components, six steering
    /// actions, clipped-policy-gradient learner.
    fn default() -> Self {
        let observation_keys = [
            "progress",
            "angle",
            "speed",
            "ray_left",
            "ray_front_left",
            "ray_front",
            "ray_front_right",
            "ray_right",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>();
        let obs_dim = observation_keys.len();

        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            workers: 4,
            observation_keys,
            actions: ActionTable::default(),
            reward: RewardShaping::default(),
            coordinator: CoordinatorConfig::default(),
            learner: LearnerConfig::Ppo(
                PpoConfig::default()
                    .actor_config(MlpConfig::new(obs_dim, vec![512, 256, 128], 6))
                    .critic_config(MlpConfig::new(obs_dim, vec![256, 256, 128], 1)),
            ),
        }
    }
}

impl ServerConfig {
    /// Builds the configured learner.
    pub fn build_learner(&self) -> Result<AnyLearner> {
        self.learner.build()
    }

    /// Checks the deployment invariants against the built learner: the
    /// action table and the observation keys must match the learner's
    /// action-space size and observation length.
    pub fn validate(&self, learner: &AnyLearner) -> Result<(), HuddleError> {
        self.actions.validate(learner.n_actions())?;
        if self.observation_keys.len() != learner.obs_dim() {
            return Err(HuddleError::ObservationLength {
                expected: learner.obs_dim(),
                got: self.observation_keys.len(),
            });
        }
        Ok(())
    }

    /// Constructs [`ServerConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ServerConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_default_config_is_consistent() {
        let config = ServerConfig::default();
        let learner = config.build_learner().unwrap();
        config.validate(&learner).unwrap();
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ServerConfig::default();
        let dir = TempDir::new("server_config").unwrap();
        let path = dir.path().join("config.yaml");
        config.save(&path).unwrap();
        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_mismatched_action_table_is_rejected() {
        let mut config = ServerConfig::default();
        config.actions.entries.pop();
        let learner = config.build_learner().unwrap();
        match config.validate(&learner) {
            Err(HuddleError::ActionSpaceMismatch { table: 5, learner: 6 }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
