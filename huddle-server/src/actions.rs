//! Action-index to named-flag mapping.
use huddle_core::error::HuddleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed mapping from discrete action indices to sets of raised boolean
/// flags.
///
/// The table is deployment configuration, but its shape is an invariant:
/// the number of entries must equal the learner's action-space size, and
/// every raised flag must be declared. Response maps always contain every
/// declared flag, defaulting to `false`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ActionTable {
    /// All boolean flags a response may carry.
    pub flags: Vec<String>,

    /// Raised flags per action index.
    pub entries: Vec<Vec<String>>,
}

impl Default for ActionTable {
    /// The six-action steering table of the racing deployment.
    fn default() -> Self {
        let e = |flags: &[&str]| flags.iter().map(|f| f.to_string()).collect::<Vec<_>>();
        Self {
            flags: e(&["up", "left", "right", "boost"]),
            entries: vec![
                e(&["up"]),
                e(&["up", "left"]),
                e(&["up", "right"]),
                e(&["up", "boost"]),
                e(&["up", "left", "boost"]),
                e(&["up", "right", "boost"]),
            ],
        }
    }
}

impl ActionTable {
    /// Number of actions in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks the table against the learner's action-space size and that
    /// every raised flag is declared.
    pub fn validate(&self, n_actions: usize) -> Result<(), HuddleError> {
        if self.entries.len() != n_actions {
            return Err(HuddleError::ActionSpaceMismatch {
                table: self.entries.len(),
                learner: n_actions,
            });
        }
        for entry in &self.entries {
            for flag in entry {
                if !self.flags.contains(flag) {
                    return Err(HuddleError::Learner(anyhow::anyhow!(
                        "action table raises undeclared flag {:?}",
                        flag
                    )));
                }
            }
        }
        Ok(())
    }

    /// The full flag map for an action index; flags not raised by the
    /// entry are present as `false`.
    pub fn response(&self, ix: usize) -> BTreeMap<String, bool> {
        let raised = &self.entries[ix];
        self.flags
            .iter()
            .map(|flag| (flag.clone(), raised.contains(flag)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_shape() {
        let table = ActionTable::default();
        assert_eq!(table.len(), 6);
        assert!(table.validate(6).is_ok());
        match table.validate(4) {
            Err(HuddleError::ActionSpaceMismatch { table: 6, learner: 4 }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_response_defaults_missing_flags_to_false() {
        let table = ActionTable::default();
        let response = table.response(1); // up + left
        assert_eq!(response["up"], true);
        assert_eq!(response["left"], true);
        assert_eq!(response["right"], false);
        assert_eq!(response["boost"], false);
        assert_eq!(response.len(), 4);
    }

    #[test]
    fn test_undeclared_flag_is_rejected() {
        let table = ActionTable {
            flags: vec!["up".to_string()],
            entries: vec![vec!["down".to_string()]],
        };
        assert!(table.validate(1).is_err());
    }
}
