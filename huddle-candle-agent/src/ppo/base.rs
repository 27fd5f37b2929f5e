//! Clipped-policy-gradient learner.
use super::PpoConfig;
use crate::{
    model::{NetModel, SubModel1},
    util::{InDim, OutDim},
};
use anyhow::{bail, Context, Result};
use candle_core::{shape::D, Device, Tensor};
use candle_nn::{
    loss::mse,
    ops::{log_softmax, softmax},
};
use huddle_core::{
    gae::{gae, normalize},
    record::{Record, RecordValue::Scalar},
    store::TransitionStore,
    ChosenAction, Learner, Transition,
};
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::SmallRng,
    SeedableRng,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

/// Clipped surrogate objective, per sample:
/// `min(ratio * advantage, clamp(ratio, 1 - eps, 1 + eps) * advantage)`.
///
/// Ratios outside the clip range cannot increase the objective beyond its
/// clipped value; that bound is the defining invariant of the algorithm.
fn clipped_surrogate(
    ratio: &Tensor,
    advantage: &Tensor,
    clip_eps: f64,
) -> candle_core::Result<Tensor> {
    let unclipped = (ratio * advantage)?;
    let clipped = (ratio.clamp(1.0 - clip_eps, 1.0 + clip_eps)? * advantage)?;
    unclipped.minimum(&clipped)
}

/// On-policy learner with the clipped surrogate objective.
///
/// Experience accumulates in the transition store until the configured
/// trigger; one optimization pass then runs a fixed number of epochs over
/// shuffled minibatches and drains the store. Advantage targets come from
/// generalized advantage estimation over the stored trajectory, normalized
/// immediately before use.
pub struct PpoLearner<P, V>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    V: SubModel1<Input = Tensor, Output = Tensor>,
{
    actor: NetModel<P>,
    critic: NetModel<V>,
    store: TransitionStore,
    gamma: f32,
    gae_lambda: f32,
    clip_eps: f64,
    vf_coef: f64,
    ent_coef: f64,
    n_epochs: usize,
    batch_size: usize,
    learning_trigger: usize,
    n_actions: usize,
    obs_dim: usize,
    n_opts: usize,
    device: Device,
    rng: SmallRng,
}

impl<P, V> PpoLearner<P, V>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    V: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: DeserializeOwned + Serialize + OutDim + InDim + Clone,
    V::Config: DeserializeOwned + Serialize + OutDim + InDim + Clone,
{
    /// Constructs the learner.
    pub fn build(config: PpoConfig<P::Config, V::Config>) -> Result<Self> {
        let device: Device = config.device.unwrap_or(crate::Device::Cpu).into();
        let actor_config = config.actor_config.context("actor_config is not set.")?;
        let critic_config = config.critic_config.context("critic_config is not set.")?;
        let n_actions = actor_config.get_out_dim();
        let obs_dim = actor_config.get_in_dim();
        if critic_config.get_in_dim() != obs_dim {
            bail!(
                "actor and critic disagree on the observation size ({} vs {})",
                obs_dim,
                critic_config.get_in_dim()
            );
        }
        if critic_config.get_out_dim() != 1 {
            bail!("the critic must output a single value estimate");
        }

        let actor = NetModel::build(actor_config, &config.actor_opt_config, &device)?;
        let critic = NetModel::build(critic_config, &config.critic_opt_config, &device)?;

        Ok(Self {
            actor,
            critic,
            store: TransitionStore::build(&config.store_config),
            gamma: config.gamma,
            gae_lambda: config.gae_lambda,
            clip_eps: config.clip_eps,
            vf_coef: config.vf_coef,
            ent_coef: config.ent_coef,
            n_epochs: config.n_epochs,
            batch_size: config.batch_size,
            learning_trigger: config.learning_trigger,
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

    fn opt_(&mut self) -> Result<Record> {
        let n = self.store.len();

        // Advantage and return targets over the stored trajectory, in
        // insertion order. The final transition of a cycle is terminal,
        // so no bootstrap value is available or needed.
        let mut obs_rows: Vec<Vec<f32>> = Vec::with_capacity(n);
        let mut acts: Vec<i64> = Vec::with_capacity(n);
        let mut old_logps: Vec<f32> = Vec::with_capacity(n);
        let mut values: Vec<f32> = Vec::with_capacity(n);
        let mut rewards: Vec<f32> = Vec::with_capacity(n);
        let mut dones: Vec<bool> = Vec::with_capacity(n);
        for tr in self.store.iter() {
            obs_rows.push(tr.obs.clone());
            acts.push(tr.act as i64);
            old_logps.push(tr.log_prob);
            values.push(tr.value);
            rewards.push(tr.reward);
            dones.push(tr.is_done);
        }
        let (mut advantages, returns) =
            gae(&rewards, &values, &dones, 0.0, self.gamma, self.gae_lambda);
        normalize(&mut advantages);

        let mut loss_actor_sum = 0f32;
        let mut loss_critic_sum = 0f32;
        let mut entropy_sum = 0f32;
        let mut n_batches = 0usize;

        for _ in 0..self.n_epochs {
            for batch_ixs in self.store.minibatch_indices(self.batch_size) {
                let b = batch_ixs.len();
                let obs_b = {
                    let mut flat = Vec::with_capacity(b * self.obs_dim);
                    for &ix in &batch_ixs {
                        flat.extend_from_slice(&obs_rows[ix]);
                    }
                    Tensor::from_vec(flat, (b, self.obs_dim), &self.device)?
                };
                let act_b = Tensor::from_vec(
                    batch_ixs.iter().map(|&ix| acts[ix]).collect::<Vec<i64>>(),
                    (b, 1),
                    &self.device,
                )?;
                let old_logp_b = Tensor::from_vec(
                    batch_ixs
                        .iter()
                        .map(|&ix| old_logps[ix])
                        .collect::<Vec<f32>>(),
                    (b,),
                    &self.device,
                )?;
                let adv_b = Tensor::from_vec(
                    batch_ixs
                        .iter()
                        .map(|&ix| advantages[ix])
                        .collect::<Vec<f32>>(),
                    (b,),
                    &self.device,
                )?;
                let ret_b = Tensor::from_vec(
                    batch_ixs
                        .iter()
                        .map(|&ix| returns[ix])
                        .collect::<Vec<f32>>(),
                    (b,),
                    &self.device,
                )?;

                let logits = self.actor.forward(&obs_b);
                let logp_all = log_softmax(&logits, D::Minus1)?;
                let logp = logp_all.gather(&act_b, D::Minus1)?.squeeze(D::Minus1)?;
                let ratio = (&logp - &old_logp_b)?.exp()?;
                let loss_policy = clipped_surrogate(&ratio, &adv_b, self.clip_eps)?
                    .mean_all()?
                    .neg()?;

                let value = self.critic.forward(&obs_b).squeeze(D::Minus1)?;
                let loss_value = mse(&value, &ret_b)?;

                let entropy = (&logp_all.exp()? * &logp_all)?
                    .sum(D::Minus1)?
                    .neg()?
                    .mean_all()?;

                let loss = (&loss_policy + (self.vf_coef * &loss_value)?)?;
                let loss = (loss - (self.ent_coef * &entropy)?)?;

                let loss_val = loss.to_scalar::<f32>()?;
                if !loss_val.is_finite() {
                    // The store is intact at this point, so the pass can
                    // be retried after the caller has logged the failure.
                    bail!("non-finite loss in optimization pass {}", self.n_opts + 1);
                }

                self.actor.backward_step(&loss)?;
                self.critic.backward_step(&loss)?;

                loss_actor_sum += loss_policy.to_scalar::<f32>()?;
                loss_critic_sum += loss_value.to_scalar::<f32>()?;
                entropy_sum += entropy.to_scalar::<f32>()?;
                n_batches += 1;
            }
        }

        self.store.clear();
        self.n_opts += 1;

        let k = n_batches as f32;
        Ok(Record::from_slice(&[
            ("loss_actor", Scalar(loss_actor_sum / k)),
            ("loss_critic", Scalar(loss_critic_sum / k)),
            ("entropy", Scalar(entropy_sum / k)),
            ("n_transitions", Scalar(n as f32)),
        ]))
    }
}

impl<P, V> Learner for PpoLearner<P, V>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    V: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: DeserializeOwned + Serialize + OutDim + InDim + Clone,
    V::Config: DeserializeOwned + Serialize + OutDim + InDim + Clone,
{
    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// Samples from the categorical distribution given by the policy; the
    /// arg-max would collapse exploration.
    fn choose_action(&mut self, obs: &[f32]) -> Result<ChosenAction> {
        let obs_t = Tensor::from_slice(obs, (1, obs.len()), &self.device)?;
        let logits = self.actor.forward(&obs_t);
        let probs: Vec<f32> = softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1()?;
        let logps: Vec<f32> = log_softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1()?;
        let act = WeightedIndex::new(&probs)?.sample(&mut self.rng);
        let value = self
            .critic
            .forward(&obs_t)
            .squeeze(0)?
            .squeeze(0)?
            .to_scalar::<f32>()?;

        Ok(ChosenAction {
            act,
            log_prob: logps[act],
            value,
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
        if self.store.len() < self.learning_trigger || self.store.len() < self.batch_size {
            return Ok(None);
        }
        self.opt_().map(Some)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.actor.save(path.join("actor.safetensors"))?;
        self.critic.save(path.join("critic.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.actor.load(path.join("actor.safetensors"))?;
        self.critic.load(path.join("critic.safetensors"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mlp::{Mlp, MlpConfig};

    fn learner(trigger: usize, batch_size: usize) -> PpoLearner<Mlp, Mlp> {
        let config = PpoConfig::default()
            .actor_config(MlpConfig::new(2, vec![8], 3))
            .critic_config(MlpConfig::new(2, vec![8], 1))
            .n_epochs(2)
            .batch_size(batch_size)
            .learning_trigger(trigger)
            .seed(7);
        PpoLearner::build(config).unwrap()
    }

    fn transition(learner: &mut PpoLearner<Mlp, Mlp>, t: usize, done: bool) -> Transition {
        let obs = vec![t as f32 * 0.01, 0.5];
        let chosen = learner.choose_action(&obs).unwrap();
        Transition {
            obs,
            act: chosen.act,
            log_prob: chosen.log_prob,
            value: chosen.value,
            reward: 0.1,
            is_done: done,
            next_obs: vec![(t + 1) as f32 * 0.01, 0.5],
        }
    }

    #[test]
    fn test_clip_dominates_above_one_plus_eps() {
        let device = Device::Cpu;
        let ratio = Tensor::from_slice(&[0.5f32, 1.0, 1.2, 1.5, 3.0], (5,), &device).unwrap();
        let advantage = Tensor::from_slice(&[1.0f32; 5], (5,), &device).unwrap();

        let objective = clipped_surrogate(&ratio, &advantage, 0.2)
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        let expected = [0.5, 1.0, 1.2, 1.2, 1.2];
        for (o, e) in objective.iter().zip(expected.iter()) {
            assert!((o - e).abs() < 1e-6, "{:?} != {:?}", objective, expected);
        }
    }

    #[test]
    fn test_choose_action_is_in_range() {
        let mut learner = learner(8, 4);
        for _ in 0..20 {
            let chosen = learner.choose_action(&[0.3, 0.7]).unwrap();
            assert!(chosen.act < 3);
            assert!(chosen.log_prob <= 0.0);
            assert!(chosen.value.is_finite());
        }
    }

    #[test]
    fn test_learn_skips_below_trigger() {
        let mut learner = learner(8, 4);
        for t in 0..7 {
            let tr = transition(&mut learner, t, false);
            learner.observe(tr).unwrap();
        }
        assert!(learner.learn().unwrap().is_none());
        assert_eq!(learner.n_transitions(), 7);
    }

    #[test]
    fn test_learn_trains_and_drains() {
        let mut learner = learner(8, 4);
        for t in 0..10 {
            let tr = transition(&mut learner, t, t == 9);
            learner.observe(tr).unwrap();
        }
        let record = learner.learn().unwrap().expect("pass should run");
        assert!(record.get_scalar("loss_critic").unwrap().is_finite());
        assert!(record.get_scalar("entropy").unwrap() > 0.0);
        assert_eq!(learner.n_transitions(), 0);
        assert_eq!(learner.n_opts(), 1);
    }

    #[test]
    fn test_save_load_roundtrip() {
        use tempdir::TempDir;

        let mut learner = learner(8, 4);
        let dir = TempDir::new("ppo_params").unwrap();
        learner.save_params(dir.path()).unwrap();
        learner.load_params(dir.path()).unwrap();
    }
}
