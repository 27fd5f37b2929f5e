//! Per-agent session state.
use super::ChosenAction;
use std::collections::HashMap;

/// State kept for one agent between its requests.
///
/// A session is created on the first request carrying a new identifier and
/// retained for the process lifetime. `last_obs`/`last_act` are `None`
/// until the first action is chosen and are cleared again when an episode
/// ends, so the first step of the next episode does not pair observations
/// across the episode boundary.
#[derive(Debug, Default)]
pub struct AgentSession {
    /// Observation of the previous request, if any.
    pub last_obs: Option<Vec<f32>>,

    /// Action chosen for `last_obs`, with its auxiliary outputs.
    pub last_act: Option<ChosenAction>,

    /// Set when the agent's episode ended; cleared by a training cycle.
    pub paused: bool,
}

/// Table of all agent sessions, keyed by the opaque agent identifier.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, AgentSession>,
}

impl SessionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `agent_id`, creating it on first sight.
    pub fn entry(&mut self, agent_id: &str) -> &mut AgentSession {
        self.sessions
            .entry(agent_id.to_string())
            .or_insert_with(AgentSession::default)
    }

    /// Looks up a session without creating it.
    pub fn get(&self, agent_id: &str) -> Option<&AgentSession> {
        self.sessions.get(agent_id)
    }

    /// Number of known sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no agent has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// True when every known session is paused.
    ///
    /// An empty table never trips the barrier: with no participants there
    /// is nothing to synchronize.
    pub fn all_paused(&self) -> bool {
        !self.sessions.is_empty() && self.sessions.values().all(|s| s.paused)
    }

    /// Clears the paused flag of every session.
    pub fn unpause_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.paused = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_is_not_all_paused() {
        let table = SessionTable::new();
        assert!(!table.all_paused());
    }

    #[test]
    fn test_all_paused_and_unpause_all() {
        let mut table = SessionTable::new();
        table.entry("a").paused = true;
        assert!(table.all_paused());

        table.entry("b");
        assert!(!table.all_paused());

        table.entry("b").paused = true;
        assert!(table.all_paused());

        table.unpause_all();
        assert!(!table.all_paused());
        assert!(!table.get("a").unwrap().paused);
        assert_eq!(table.len(), 2);
    }
}
