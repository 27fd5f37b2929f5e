//! Clipped-policy-gradient learner.
mod base;
mod config;
pub use base::PpoLearner;
pub use config::PpoConfig;
