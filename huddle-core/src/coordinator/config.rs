//! Configuration of [`TrainingCoordinator`](super::TrainingCoordinator).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`TrainingCoordinator`](super::TrainingCoordinator).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CoordinatorConfig {
    /// Where to save learner parameters after training cycles. `None`
    /// disables saving.
    pub model_dir: Option<String>,

    /// Interval of saving parameters, in completed training cycles.
    pub save_interval: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            save_interval: 1,
        }
    }
}

impl CoordinatorConfig {
    /// Sets the directory for saving learner parameters.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    /// Sets the interval of saving in completed training cycles.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Constructs [`CoordinatorConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CoordinatorConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
