//! Bounded transition store.
use super::TransitionStoreConfig;
use crate::Transition;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::VecDeque;

/// Append-only, bounded store of experience tuples.
///
/// Both optimizer variants share this structure; they differ only in how
/// they take data out. The on-policy variant partitions the whole contents
/// into shuffled minibatches and drains the store after a completed pass.
/// The replay variant samples uniformly and keeps the contents, relying on
/// eviction of the oldest entry to bound memory. Eviction is defined
/// behavior, not an error.
pub struct TransitionStore {
    capacity: usize,
    items: VecDeque<Transition>,
    rng: StdRng,
}

impl TransitionStore {
    /// Builds an empty store from the given configuration.
    pub fn build(config: &TransitionStoreConfig) -> Self {
        Self {
            capacity: config.capacity,
            items: VecDeque::with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Appends a transition, evicting the oldest entry at capacity.
    pub fn push(&mut self, tr: Transition) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(tr);
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The transition at `ix`, in insertion order.
    pub fn get(&self, ix: usize) -> &Transition {
        &self.items[ix]
    }

    /// Iterates over the contents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.items.iter()
    }

    /// Partitions the current contents into shuffled minibatches.
    ///
    /// A random permutation of all indices is chunked into contiguous
    /// blocks of `batch_size`; the final block may be short. Callers must
    /// skip the optimization pass entirely when `len() < batch_size`
    /// rather than train on a short batch.
    pub fn minibatch_indices(&mut self, batch_size: usize) -> Vec<Vec<usize>> {
        let mut ixs: Vec<usize> = (0..self.items.len()).collect();
        ixs.shuffle(&mut self.rng);
        ixs.chunks(batch_size).map(|c| c.to_vec()).collect()
    }

    /// Draws `batch_size` distinct indices uniformly at random.
    ///
    /// Entries may repeat across calls; that is the replay contract.
    pub fn sample_indices(&mut self, batch_size: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, self.items.len(), batch_size).into_vec()
    }

    /// Drains the store after a completed on-policy pass.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(reward: f32) -> Transition {
        Transition {
            obs: vec![0.0, 0.0],
            act: 0,
            log_prob: 0.0,
            value: 0.0,
            reward,
            is_done: false,
            next_obs: vec![0.0, 0.0],
        }
    }

    fn store(capacity: usize) -> TransitionStore {
        TransitionStore::build(&TransitionStoreConfig::default().capacity(capacity).seed(7))
    }

    #[test]
    fn test_push_evicts_oldest_at_capacity() {
        let mut store = store(3);
        for i in 0..5 {
            store.push(transition(i as f32));
            assert!(store.len() <= 3);
        }
        assert_eq!(store.len(), 3);
        // 0 and 1 were evicted.
        let rewards: Vec<f32> = store.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_minibatch_indices_partition() {
        let mut store = store(100);
        for i in 0..10 {
            store.push(transition(i as f32));
        }
        let batches = store.minibatch_indices(4);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 4);
        assert_eq!(batches[2].len(), 2);

        // Every index appears exactly once across the partition.
        let mut seen: Vec<usize> = batches.into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_indices_are_distinct_within_draw() {
        let mut store = store(100);
        for i in 0..20 {
            store.push(transition(i as f32));
        }
        let mut ixs = store.sample_indices(8);
        assert_eq!(ixs.len(), 8);
        ixs.sort_unstable();
        ixs.dedup();
        assert_eq!(ixs.len(), 8);
    }

    #[test]
    fn test_clear_empties_the_store() {
        let mut store = store(100);
        for i in 0..4 {
            store.push(transition(i as f32));
        }
        store.clear();
        assert!(store.is_empty());
    }
}
