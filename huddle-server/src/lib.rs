//! HTTP edge of the huddle online training loop.
//!
//! Browser game clients poll `POST /get_action` for actions and
//! `GET /check_unpause` for release after their episode ends; the wire
//! shapes are fixed so existing clients keep working. Everything behind
//! the routes is [`huddle_core::TrainingCoordinator`].
pub mod actions;
pub mod api;
pub mod config;
pub mod http;
pub mod learner;
