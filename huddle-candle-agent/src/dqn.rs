//! Q-learning learner.
mod base;
mod config;
mod explorer;
pub use base::DqnLearner;
pub use config::DqnConfig;
pub use explorer::EpsilonGreedy;
