use super::EpsilonGreedy;
use crate::{
    opt::OptimizerConfig,
    util::{InDim, OutDim},
    Device,
};
use anyhow::Result;
use huddle_core::store::TransitionStoreConfig;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DqnLearner`](super::DqnLearner).
pub struct DqnConfig<Q>
where
    Q: OutDim + InDim,
{
    /// Configuration of the action-value network. Its output dimension is
    /// the action-space size.
    pub q_config: Option<Q>,

    /// Optimizer of the action-value network.
    pub opt_config: OptimizerConfig,

    /// Configuration of the replay transition store.
    pub store_config: TransitionStoreConfig,

    /// Discount factor.
    pub gamma: f32,

    /// Minibatch size.
    pub batch_size: usize,

    /// Number of minibatch regressions per optimization pass.
    pub n_updates_per_opt: usize,

    /// Minimum number of stored transitions before a pass may run.
    pub min_transitions_warmup: usize,

    /// Epsilon-greedy exploration schedule.
    pub explorer: EpsilonGreedy,

    /// Interval of target-network synchronization, in optimization passes.
    pub target_update_interval: usize,

    /// Polyak coefficient of the synchronization; 1.0 is a hard copy.
    pub tau: f64,

    /// Reset epsilon to its start value every this many passes.
    pub eps_reset_interval: Option<usize>,

    /// Seed of the exploration random number generator.
    pub seed: u64,

    /// Device on which the networks live.
    pub device: Option<Device>,
}

impl<Q> Default for DqnConfig<Q>
where
    Q: OutDim + InDim,
{
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::Adam { lr: 1e-3 },
            store_config: TransitionStoreConfig::default().capacity(20_000),
            gamma: 0.99,
            batch_size: 256,
            n_updates_per_opt: 1,
            min_transitions_warmup: 256,
            explorer: EpsilonGreedy::new(),
            target_update_interval: 4,
            tau: 1.0,
            eps_reset_interval: None,
            seed: 42,
            device: None,
        }
    }
}

impl<Q> DqnConfig<Q>
where
    Q: DeserializeOwned + Serialize + OutDim + InDim,
{
    /// Sets the configuration of the action-value network.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the configuration of the transition store.
    pub fn store_config(mut self, v: TransitionStoreConfig) -> Self {
        self.store_config = v;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the minibatch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the number of minibatch regressions per pass.
    pub fn n_updates_per_opt(mut self, v: usize) -> Self {
        self.n_updates_per_opt = v;
        self
    }

    /// Sets the warmup threshold in stored transitions.
    pub fn min_transitions_warmup(mut self, v: usize) -> Self {
        self.min_transitions_warmup = v;
        self
    }

    /// Sets the exploration schedule.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the target-network synchronization interval.
    pub fn target_update_interval(mut self, v: usize) -> Self {
        self.target_update_interval = v;
        self
    }

    /// Sets the polyak coefficient of the synchronization.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Sets the periodic epsilon reset interval.
    pub fn eps_reset_interval(mut self, v: Option<usize>) -> Self {
        self.eps_reset_interval = v;
        self
    }

    /// Sets the seed of the exploration random number generator.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = Some(v);
        self
    }

    /// Constructs [`DqnConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DqnConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
