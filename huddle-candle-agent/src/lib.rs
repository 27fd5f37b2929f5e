//! Learners for huddle implemented with [candle](https://crates.io/crates/candle-core).
//!
//! Two variants of [`huddle_core::Learner`] live here: [`ppo::PpoLearner`],
//! the on-policy clipped-policy-gradient optimizer, and
//! [`dqn::DqnLearner`], the replay-based Q-learning optimizer.
pub mod dqn;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod ppo;
pub mod util;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support
/// serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl From<candle_core::Device> for Device {
    fn from(device: candle_core::Device) -> Self {
        match device {
            candle_core::Device::Cpu => Self::Cpu,
            _ => unimplemented!(),
        }
    }
}

impl Into<candle_core::Device> for Device {
    fn into(self) -> candle_core::Device {
        match self {
            Self::Cpu => candle_core::Device::Cpu,
            Self::Cuda(n) => candle_core::Device::new_cuda(n).unwrap(),
        }
    }
}
