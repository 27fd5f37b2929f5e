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
/// Configuration of [`PpoLearner`](super::PpoLearner).
pub struct PpoConfig<P, V>
where
    P: OutDim + InDim,
    V: OutDim + InDim,
{
    /// Configuration of the policy network. Its output dimension is the
    /// action-space size.
    pub actor_config: Option<P>,

    /// Configuration of the value network. Its output dimension must be 1.
    pub critic_config: Option<V>,

    /// Optimizer of the policy network.
    pub actor_opt_config: OptimizerConfig,

    /// Optimizer of the value network.
    pub critic_opt_config: OptimizerConfig,

    /// Configuration of the on-policy transition store.
    pub store_config: TransitionStoreConfig,

    /// Discount factor.
    pub gamma: f32,

    /// Trace-decay parameter of generalized advantage estimation.
    pub gae_lambda: f32,

    /// Clip range of the probability ratio.
    pub clip_eps: f64,

    /// Weight of the value loss in the total loss.
    pub vf_coef: f64,

    /// Weight of the entropy bonus subtracted from the total loss.
    pub ent_coef: f64,

    /// Number of epochs over the store per optimization pass.
    pub n_epochs: usize,

    /// Minibatch size.
    pub batch_size: usize,

    /// Minimum number of stored transitions before a pass may run.
    pub learning_trigger: usize,

    /// Seed of the action-sampling random number generator.
    pub seed: u64,

    /// Device on which the networks live.
    pub device: Option<Device>,
}

impl<P, V> Default for PpoConfig<P, V>
where
    P: OutDim + InDim,
    V: OutDim + InDim,
{
    fn default() -> Self {
        Self {
            actor_config: None,
            critic_config: None,
            actor_opt_config: OptimizerConfig::Adam { lr: 3e-4 },
            critic_opt_config: OptimizerConfig::Adam { lr: 3e-4 },
            store_config: TransitionStoreConfig::default(),
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_eps: 0.2,
            vf_coef: 0.5,
            ent_coef: 0.1,
            n_epochs: 10,
            batch_size: 64,
            learning_trigger: 100,
            seed: 42,
            device: None,
        }
    }
}

impl<P, V> PpoConfig<P, V>
where
    P: DeserializeOwned + Serialize + OutDim + InDim,
    V: DeserializeOwned + Serialize + OutDim + InDim,
{
    /// Sets the configuration of the policy network.
    pub fn actor_config(mut self, v: P) -> Self {
        self.actor_config = Some(v);
        self
    }

    /// Sets the configuration of the value network.
    pub fn critic_config(mut self, v: V) -> Self {
        self.critic_config = Some(v);
        self
    }

    /// Sets the optimizer configuration of both networks.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.actor_opt_config = v.clone();
        self.critic_opt_config = v;
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

    /// Sets the trace-decay parameter.
    pub fn gae_lambda(mut self, v: f32) -> Self {
        self.gae_lambda = v;
        self
    }

    /// Sets the clip range.
    pub fn clip_eps(mut self, v: f64) -> Self {
        self.clip_eps = v;
        self
    }

    /// Sets the weight of the value loss.
    pub fn vf_coef(mut self, v: f64) -> Self {
        self.vf_coef = v;
        self
    }

    /// Sets the weight of the entropy bonus.
    pub fn ent_coef(mut self, v: f64) -> Self {
        self.ent_coef = v;
        self
    }

    /// Sets the number of epochs per optimization pass.
    pub fn n_epochs(mut self, v: usize) -> Self {
        self.n_epochs = v;
        self
    }

    /// Sets the minibatch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the minimum number of transitions before a pass may run.
    pub fn learning_trigger(mut self, v: usize) -> Self {
        self.learning_trigger = v;
        self
    }

    /// Sets the seed of the action-sampling random number generator.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = Some(v);
        self
    }

    /// Constructs [`PpoConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PpoConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
