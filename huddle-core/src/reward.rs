//! Reward shaping.
//!
//! All shaping constants are deployment configuration, not algorithm
//! behavior. By convention the first observation component is the game
//! progress fraction in `[0, 1]` and the second, when present, is the
//! normalized steering angle.
use serde::{Deserialize, Serialize};

/// Extra reward for holding a correct steering angle inside a progress
/// window (e.g. the approach to an automatic boost section).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ZoneShaping {
    /// Lower progress bound of the window (exclusive).
    pub progress_min: f32,

    /// Upper progress bound of the window (exclusive).
    pub progress_max: f32,

    /// An angle within this margin of 0.0 or 1.0 counts as correct.
    pub angle_margin: f32,

    /// Added when the angle is correct, subtracted when it is not.
    pub bonus: f32,
}

impl Default for ZoneShaping {
    fn default() -> Self {
        Self {
            progress_min: 0.09,
            progress_max: 0.13,
            angle_margin: 0.01,
            bonus: 0.1,
        }
    }
}

/// Reward function over consecutive observations.
///
/// Terminal steps are overridden with a fixed win reward or loss penalty
/// regardless of the progress delta; non-terminal steps earn the scaled
/// progress difference plus optional zone shaping.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RewardShaping {
    /// Multiplier on the progress delta between consecutive observations.
    pub progress_scale: f32,

    /// Terminal reward when the episode ended in a win.
    pub win_reward: f32,

    /// Terminal reward when the episode ended without a win.
    pub loss_penalty: f32,

    /// Optional steering-angle shaping window.
    pub zone: Option<ZoneShaping>,
}

impl Default for RewardShaping {
    fn default() -> Self {
        Self {
            progress_scale: 10.0,
            win_reward: 1.0,
            loss_penalty: -1.0,
            zone: None,
        }
    }
}

impl RewardShaping {
    /// Computes the reward for the step from `last_obs` to `obs`.
    pub fn reward(&self, last_obs: &[f32], obs: &[f32], done: bool, win: bool) -> f32 {
        if done {
            return if win { self.win_reward } else { self.loss_penalty };
        }

        let progress = obs.first().copied().unwrap_or(0.0);
        let last_progress = last_obs.first().copied().unwrap_or(0.0);
        let mut reward = (progress - last_progress) * self.progress_scale;

        if let Some(zone) = &self.zone {
            if progress > zone.progress_min && progress < zone.progress_max {
                let angle = obs.get(1).copied().unwrap_or(0.0);
                if angle < zone.angle_margin || angle > 1.0 - zone.angle_margin {
                    reward += zone.bonus;
                } else {
                    reward -= zone.bonus;
                }
            }
        }

        reward
    }
}
