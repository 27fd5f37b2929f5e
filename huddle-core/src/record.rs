//! Key-value records of training metrics.
//!
//! Learners return a [`Record`] from each optimization pass; the
//! coordinator merges in episode statistics and emits the result through
//! the logger.
use chrono::prelude::{DateTime, Local};
use std::collections::{hash_map::Iter, HashMap};

/// Represents possible types of values in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating-point value, typically a loss or an average.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A text value.
    String(String),
}

/// A container of key-value pairs of metrics.
#[derive(Debug)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a scalar value by key.
    pub fn get_scalar(&self, k: &str) -> Option<f32> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns true if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges the entries of another record into this one.
    pub fn merge(mut self, other: Record) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Formats the scalar entries as a single log line, keys sorted.
    pub fn to_line(&self) -> String {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
            .iter()
            .map(|(k, v)| match v {
                RecordValue::Scalar(x) => format!("{}={:.5}", k, x),
                RecordValue::DateTime(t) => format!("{}={}", k, t.format("%H:%M:%S")),
                RecordValue::String(s) => format!("{}={}", k, s),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordValue::Scalar};

    #[test]
    fn test_merge_and_get() {
        let r1 = Record::from_slice(&[("loss_actor", Scalar(0.5))]);
        let r2 = Record::from_slice(&[("loss_critic", Scalar(1.5))]);
        let r = r1.merge(r2);
        assert_eq!(r.get_scalar("loss_actor"), Some(0.5));
        assert_eq!(r.get_scalar("loss_critic"), Some(1.5));
        assert_eq!(r.get_scalar("missing"), None);
    }

    #[test]
    fn test_to_line_sorts_keys() {
        let mut r = Record::empty();
        r.insert("b", Scalar(2.0));
        r.insert("a", Scalar(1.0));
        assert_eq!(r.to_line(), "a=1.00000 b=2.00000");
    }
}
