//! Q-learning learner.
use super::{DqnConfig, EpsilonGreedy};
use crate::{
    model::{NetModel, SubModel1},
    util::{track, InDim, OutDim},
};
use anyhow::{bail, Context, Result};
use candle_core::{shape::D, Device, Tensor};
use candle_nn::loss::mse;
use huddle_core::{
    record::{Record, RecordValue::Scalar},
    store::TransitionStore,
    ChosenAction, Learner, Transition,
};
use log::info;
use rand::{rngs::SmallRng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

/// Replay learner regressing toward bootstrapped TD(0) targets.
///
/// Transitions persist in a rolling store and are sampled repeatedly.
/// Targets come from a separate target network that is synchronized from
/// the online network on a fixed schedule, which keeps the regression
/// targets stable between synchronizations.
pub struct DqnLearner<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
{
    qnet: NetModel<Q>,
    qnet_tgt: NetModel<Q>,
    store: TransitionStore,
    explorer: EpsilonGreedy,
    gamma: f32,
    batch_size: usize,
    n_updates_per_opt: usize,
    min_transitions_warmup: usize,
    target_update_interval: usize,
    tau: f64,
    eps_reset_interval: Option<usize>,
    n_actions: usize,
    obs_dim: usize,
    n_opts: usize,
    device: Device,
    rng: SmallRng,
}

impl<Q> DqnLearner<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + InDim + Clone,
{
    /// Constructs the learner. The target network starts as an exact copy
    /// of the online network.
    pub fn build(config: DqnConfig<Q::Config>) -> Result<Self> {
        let device: Device = config.device.unwrap_or(crate::Device::Cpu).into();
        let q_config = config.q_config.context("q_config is not set.")?;
        let n_actions = q_config.get_out_dim();
        let obs_dim = q_config.get_in_dim();

        let qnet = NetModel::build(q_config.clone(), &config.opt_config, &device)?;
        let qnet_tgt = NetModel::build(q_config, &config.opt_config, &device)?;
        track(qnet_tgt.varmap(), qnet.varmap(), 1.0)?;

        Ok(Self {
            qnet,
            qnet_tgt,
            store: TransitionStore::build(&config.store_config),
            explorer: config.explorer,
            gamma: config.gamma,
            batch_size: config.batch_size,
            n_updates_per_opt: config.n_updates_per_opt,
            min_transitions_warmup: config.min_transitions_warmup,
            target_update_interval: config.target_update_interval,
            tau: config.tau,
            eps_reset_interval: config.eps_reset_interval,
            n_actions,
            obs_dim,
            n_opts: 0,
            device,
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }

    /// Number of completed optimization passes.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Current exploration epsilon.
    pub fn eps(&self) -> f64 {
        self.explorer.eps
    }

    fn update_critic(&mut self) -> Result<f32> {
        let ixs = self.store.sample_indices(self.batch_size);
        let b = ixs.len();

        let mut obs_flat = Vec::with_capacity(b * self.obs_dim);
        let mut next_obs_flat = Vec::with_capacity(b * self.obs_dim);
        let mut acts = Vec::with_capacity(b);
        let mut rewards = Vec::with_capacity(b);
        let mut not_dones = Vec::with_capacity(b);
        for &ix in &ixs {
            let tr = self.store.get(ix);
            obs_flat.extend_from_slice(&tr.obs);
            next_obs_flat.extend_from_slice(&tr.next_obs);
            acts.push(tr.act as i64);
            rewards.push(tr.reward);
            not_dones.push(if tr.is_done { 0f32 } else { 1f32 });
        }
        let obs = Tensor::from_vec(obs_flat, (b, self.obs_dim), &self.device)?;
        let next_obs = Tensor::from_vec(next_obs_flat, (b, self.obs_dim), &self.device)?;
        let act = Tensor::from_vec(acts, (b, 1), &self.device)?;
        let reward = Tensor::from_vec(rewards, (b,), &self.device)?;
        let not_done = Tensor::from_vec(not_dones, (b,), &self.device)?;

        // target = r + gamma * (1 - done) * max_a Q_tgt(s', a)
        let tgt = {
            let q_next = self.qnet_tgt.forward(&next_obs).max(D::Minus1)?;
            (&reward + ((&not_done * self.gamma as f64)? * &q_next)?)?
        }
        .detach();

        let pred = self
            .qnet
            .forward(&obs)
            .gather(&act, D::Minus1)?
            .squeeze(D::Minus1)?;
        let loss = mse(&pred, &tgt)?;

        let loss_val = loss.to_scalar::<f32>()?;
        if !loss_val.is_finite() {
            bail!("non-finite loss in optimization pass {}", self.n_opts + 1);
        }

        self.qnet.backward_step(&loss)?;
        Ok(loss_val)
    }

    fn opt_(&mut self) -> Result<Record> {
        let mut loss_critic = 0f32;
        for _ in 0..self.n_updates_per_opt {
            loss_critic += self.update_critic()?;
        }
        loss_critic /= self.n_updates_per_opt as f32;

        self.n_opts += 1;
        self.explorer.decay();
        if let Some(interval) = self.eps_reset_interval {
            if interval > 0 && self.n_opts % interval == 0 {
                self.explorer.reset();
                info!(
                    "epsilon reset to {} after {} passes",
                    self.explorer.eps, self.n_opts
                );
            }
        }
        if self.n_opts % self.target_update_interval == 0 {
            track(self.qnet_tgt.varmap(), self.qnet.varmap(), self.tau)?;
        }

        Ok(Record::from_slice(&[
            ("loss_critic", Scalar(loss_critic)),
            ("epsilon", Scalar(self.explorer.eps as f32)),
        ]))
    }
}

impl<Q> Learner for DqnLearner<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + InDim + Clone,
{
    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    fn choose_action(&mut self, obs: &[f32]) -> Result<ChosenAction> {
        let obs_t = Tensor::from_slice(obs, (1, obs.len()), &self.device)?;
        let q_values: Vec<f32> = self.qnet.forward(&obs_t).squeeze(0)?.to_vec1()?;
        let act = self.explorer.action(&q_values, &mut self.rng);

        // No auxiliary outputs in this variant.
        Ok(ChosenAction {
            act,
            log_prob: 0.0,
            value: 0.0,
        })
    }

    fn observe(&mut self, tr: Transition) -> Result<()> {
        self.store.push(tr);
        Ok(())
    }

    fn n_transitions(&self) -> usize {
        self.store.len()
    }

    fn learn(&mut self) -> Result<Option<Record>> {
        if self.store.len() < self.batch_size || self.store.len() < self.min_transitions_warmup {
            return Ok(None);
        }
        self.opt_().map(Some)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.qnet.save(path.join("qnet.safetensors"))?;
        self.qnet_tgt.save(path.join("qnet_tgt.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(path.join("qnet.safetensors"))?;
        self.qnet_tgt.load(path.join("qnet_tgt.safetensors"))?;
        Ok(())
    }
}
