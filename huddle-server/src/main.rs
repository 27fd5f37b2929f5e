//! The `huddled` binary.
use anyhow::Result;
use clap::Parser;
use huddle_core::{Learner, TrainingCoordinator};
use huddle_server::{config::ServerConfig, http};
use log::info;
use std::{path::PathBuf, sync::Arc};

/// Online training server for concurrently polling game agents.
#[derive(Parser, Debug)]
#[command(name = "huddled", version, about)]
struct Args {
    /// Path to the server configuration file (YAML). Defaults to the
    /// built-in racing deployment.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the bind address from the configuration.
    #[arg(long)]
    bind: Option<String>,

    /// Overrides the directory for saving learner parameters.
    #[arg(long)]
    model_dir: Option<String>,

    /// Loads learner parameters from this directory before serving.
    #[arg(long)]
    load_params: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(model_dir) = args.model_dir {
        config.coordinator.model_dir = Some(model_dir);
    }

    let mut learner = config.build_learner()?;
    config.validate(&learner)?;
    if let Some(path) = &args.load_params {
        learner.load_params(path)?;
        info!("loaded learner parameters from {:?}", path);
    }

    let coordinator = Arc::new(TrainingCoordinator::build(
        config.coordinator.clone(),
        config.reward.clone(),
        learner,
    ));

    http::serve(&config, coordinator)
}
