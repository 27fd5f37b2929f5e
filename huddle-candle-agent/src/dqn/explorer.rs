//! Exploration strategy of the Q-learning learner.
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Epsilon-greedy action selection.
///
/// Epsilon decays multiplicatively toward its floor after every
/// optimization pass. The learner may also reset it to `eps_start` on a
/// periodic schedule to force re-exploration.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Value epsilon starts at, and is reset to.
    pub eps_start: f64,

    /// Floor of the decay.
    pub eps_final: f64,

    /// Multiplicative decay factor applied per optimization pass.
    pub eps_decay: f64,

    /// Current epsilon.
    pub eps: f64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self::new()
    }
}

impl EpsilonGreedy {
    /// Constructs the explorer with epsilon at its start value.
    pub fn new() -> Self {
        Self {
            eps_start: 1.0,
            eps_final: 0.01,
            eps_decay: 0.995,
            eps: 1.0,
        }
    }

    /// Sets the start value and resets the current epsilon to it.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self.eps = v;
        self
    }

    /// Sets the floor of the decay.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }

    /// Sets the multiplicative decay factor.
    pub fn eps_decay(mut self, v: f64) -> Self {
        self.eps_decay = v;
        self
    }

    /// Takes an action given the action values: uniformly random with
    /// probability epsilon, the arg-max otherwise.
    pub fn action(&self, q_values: &[f32], rng: &mut impl Rng) -> usize {
        if rng.gen::<f64>() < self.eps {
            rng.gen_range(0..q_values.len())
        } else {
            q_values
                .iter()
                .enumerate()
                .fold((0, f32::MIN), |best, (ix, &q)| {
                    if q > best.1 {
                        (ix, q)
                    } else {
                        best
                    }
                })
                .0
        }
    }

    /// Decays epsilon toward the floor.
    pub fn decay(&mut self) {
        self.eps = (self.eps * self.eps_decay).max(self.eps_final);
    }

    /// Resets epsilon to its start value.
    pub fn reset(&mut self) {
        self.eps = self.eps_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_decay_is_monotone_with_floor() {
        let mut explorer = EpsilonGreedy::new().eps_final(0.5);
        let mut prev = explorer.eps;
        for _ in 0..500 {
            explorer.decay();
            assert!(explorer.eps <= prev);
            prev = explorer.eps;
        }
        assert_eq!(explorer.eps, 0.5);

        explorer.reset();
        assert_eq!(explorer.eps, 1.0);
    }

    #[test]
    fn test_zero_eps_is_greedy() {
        let mut explorer = EpsilonGreedy::new().eps_start(0.0);
        explorer.eps = 0.0;
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(explorer.action(&[0.1, 0.9, 0.3], &mut rng), 1);
        assert_eq!(explorer.action(&[2.0, 0.9, 0.3], &mut rng), 0);
    }
}
