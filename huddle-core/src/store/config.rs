//! Configuration of [`TransitionStore`](super::TransitionStore).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`TransitionStore`](super::TransitionStore).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TransitionStoreConfig {
    /// Maximum number of transitions kept. The oldest entry is evicted
    /// when a push would exceed this.
    pub capacity: usize,

    /// Seed of the random number generator used for shuffling and
    /// sampling.
    pub seed: u64,
}

impl Default for TransitionStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            seed: 42,
        }
    }
}

impl TransitionStoreConfig {
    /// Sets the capacity of the store.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for shuffling and sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Constructs [`TransitionStoreConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TransitionStoreConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
