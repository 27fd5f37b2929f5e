//! Generalized advantage estimation.
//!
//! Converts an ordered trajectory of rewards, value estimates and done
//! flags into per-step advantage and return targets:
//!
//! ```text
//! delta_t     = reward_t + gamma * value_{t+1} * (1 - done_t) - value_t
//! advantage_t = delta_t + gamma * lambda * advantage_{t+1} * (1 - done_t)
//! return_t    = advantage_t + value_t
//! ```
//!
//! `done_t` masks both the bootstrap and the trace carry-over, so the
//! recursion never leaks across episode boundaries.

/// Computes advantages and returns for one ordered trajectory.
///
/// `last_value` is the bootstrap for the step beyond the trajectory; pass
/// 0 when the trajectory ends in a terminal state.
pub fn gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    debug_assert_eq!(values.len(), n);
    debug_assert_eq!(dones.len(), n);

    let mut advantages = vec![0.0; n];
    let mut returns = vec![0.0; n];
    let mut advantage = 0.0;

    for t in (0..n).rev() {
        let not_done = if dones[t] { 0.0 } else { 1.0 };
        let next_value = if t == n - 1 { last_value } else { values[t + 1] };
        let delta = rewards[t] + gamma * next_value * not_done - values[t];
        advantage = delta + gamma * lambda * advantage * not_done;
        advantages[t] = advantage;
        returns[t] = advantage + values[t];
    }

    (advantages, returns)
}

/// Normalizes advantages in place to zero mean and unit standard
/// deviation, with an epsilon floor on the denominator.
pub fn normalize(advantages: &mut [f32]) {
    if advantages.is_empty() {
        return;
    }
    let n = advantages.len() as f32;
    let mean: f32 = advantages.iter().sum::<f32>() / n;
    let var: f32 = advantages.iter().map(|&a| (a - mean) * (a - mean)).sum::<f32>() / n;
    let std = var.sqrt().max(1e-8);
    for a in advantages.iter_mut() {
        *a = (*a - mean) / std;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMMA: f32 = 0.99;
    const LAMBDA: f32 = 0.95;

    #[test]
    fn test_all_done_collapses_to_reward_minus_value() {
        let rewards = vec![1.0, -0.5, 2.0];
        let values = vec![0.3, 0.7, -0.2];
        let dones = vec![true, true, true];

        let (advantages, returns) = gae(&rewards, &values, &dones, 5.0, GAMMA, LAMBDA);

        for t in 0..3 {
            assert!((advantages[t] - (rewards[t] - values[t])).abs() < 1e-6);
            assert!((returns[t] - rewards[t]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_length_one_trajectory_is_delta() {
        let (advantages, _) = gae(&[2.0], &[0.5], &[false], 1.0, GAMMA, LAMBDA);
        let delta = 2.0 + GAMMA * 1.0 - 0.5;
        assert!((advantages[0] - delta).abs() < 1e-6);
    }

    #[test]
    fn test_recursion_matches_hand_computation() {
        let rewards = vec![1.0, 1.0];
        let values = vec![0.0, 0.0];
        let dones = vec![false, false];

        let (advantages, returns) = gae(&rewards, &values, &dones, 0.5, GAMMA, LAMBDA);

        let delta1 = 1.0 + GAMMA * 0.5;
        let delta0 = 1.0;
        assert!((advantages[1] - delta1).abs() < 1e-6);
        assert!((advantages[0] - (delta0 + GAMMA * LAMBDA * delta1)).abs() < 1e-6);
        assert!((returns[0] - advantages[0]).abs() < 1e-6);
    }

    #[test]
    fn test_done_cuts_the_trace() {
        // Step 0 ends an episode; its advantage must ignore step 1 entirely.
        let rewards = vec![1.0, 100.0];
        let values = vec![0.25, 3.0];
        let dones = vec![true, false];

        let (advantages, _) = gae(&rewards, &values, &dones, 0.0, GAMMA, LAMBDA);
        assert!((advantages[0] - (1.0 - 0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_mean_unit_std() {
        let mut advantages = vec![1.0, 2.0, 3.0, 4.0];
        normalize(&mut advantages);

        let mean: f32 = advantages.iter().sum::<f32>() / 4.0;
        let var: f32 = advantages.iter().map(|a| (a - mean) * (a - mean)).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-6);
        assert!((var - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_constant_advantages_does_not_divide_by_zero() {
        let mut advantages = vec![0.5; 8];
        normalize(&mut advantages);
        assert!(advantages.iter().all(|a| a.is_finite()));
        assert!(advantages.iter().all(|a| a.abs() < 1e-6));
    }
}
