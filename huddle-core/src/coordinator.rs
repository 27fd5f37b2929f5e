//! The training-cycle protocol over sessions, barrier and learner.
mod config;

use crate::{
    error::HuddleError,
    record::{Record, RecordValue::Scalar},
    reward::RewardShaping,
    Learner, SessionTable, TrainingBarrier, Transition,
};
pub use config::CoordinatorConfig;
use log::{error, info};
use std::path::Path;
use std::sync::Mutex;

/// What the request path returns for one agent step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Discrete action index chosen for the new observation.
    pub act: usize,

    /// Whether the agent must pause and poll for release.
    pub pause: bool,
}

/// Episode statistics aggregated between training cycles.
///
/// Replaces the charting of earlier revisions; the aggregate is merged
/// into the cycle record and logged.
#[derive(Debug, Default)]
struct CycleStats {
    episodes: usize,
    reward_sum: f32,
    final_progress_sum: f32,
}

impl CycleStats {
    fn on_reward(&mut self, reward: f32) {
        self.reward_sum += reward;
    }

    fn on_episode_end(&mut self, final_progress: f32) {
        self.episodes += 1;
        self.final_progress_sum += final_progress;
    }

    fn drain_record(&mut self) -> Record {
        let mut record = Record::empty();
        record.insert("episodes", Scalar(self.episodes as f32));
        if self.episodes > 0 {
            let n = self.episodes as f32;
            record.insert("avg_episode_reward", Scalar(self.reward_sum / n));
            record.insert("avg_final_progress", Scalar(self.final_progress_sum / n));
        }
        *self = Self::default();
        record
    }
}

struct CoordinatorState<L> {
    sessions: SessionTable,
    learner: L,
    stats: CycleStats,
    cycles: usize,
}

/// Drives the training protocol for concurrently polling agents.
///
/// All mutation of the session table and the learner happens under one
/// coarse mutex; the three shared structures are tightly coupled, so a
/// single lock keeps their updates linearizable. The barrier flag is read
/// outside the lock so that action requests arriving during an
/// optimization pass are answered with [`HuddleError::TrainingInProgress`]
/// instead of queueing behind it.
///
/// Liveness: every admitted cycle releases every paused session before
/// it completes, including cycles skipped for lack of data and cycles
/// aborted by a learner failure.
pub struct TrainingCoordinator<L: Learner> {
    state: Mutex<CoordinatorState<L>>,
    barrier: TrainingBarrier,
    shaping: RewardShaping,
    config: CoordinatorConfig,
}

impl<L: Learner> TrainingCoordinator<L> {
    /// Constructs a coordinator around the given learner.
    pub fn build(config: CoordinatorConfig, shaping: RewardShaping, learner: L) -> Self {
        Self {
            state: Mutex::new(CoordinatorState {
                sessions: SessionTable::new(),
                learner,
                stats: CycleStats::default(),
                cycles: 0,
            }),
            barrier: TrainingBarrier::new(),
            shaping,
            config,
        }
    }

    /// True while an optimization pass is running.
    pub fn is_training(&self) -> bool {
        self.barrier.is_training()
    }

    /// Handles one action request from an agent.
    ///
    /// Pairs the previous cached action with the new observation into a
    /// [`Transition`], chooses the next action, and marks the session
    /// paused when the episode ended.
    pub fn step(
        &self,
        agent_id: &str,
        obs: Vec<f32>,
        done: bool,
        win: bool,
    ) -> Result<StepOutcome, HuddleError> {
        if self.barrier.is_training() {
            return Err(HuddleError::TrainingInProgress);
        }

        let mut state = self.state.lock().unwrap();
        let expected = state.learner.obs_dim();
        if obs.len() != expected {
            return Err(HuddleError::ObservationLength {
                expected,
                got: obs.len(),
            });
        }
        if let Some(ix) = obs.iter().position(|v| !v.is_finite()) {
            return Err(HuddleError::ObservationNotFinite(ix));
        }

        let CoordinatorState {
            sessions,
            learner,
            stats,
            ..
        } = &mut *state;
        let session = sessions.entry(agent_id);

        // A transition exists only once a previous round has been cached
        // for this agent; the first request of an episode only selects an
        // action.
        if let (Some(last_obs), Some(last_act)) = (session.last_obs.take(), session.last_act.take())
        {
            let reward = self.shaping.reward(&last_obs, &obs, done, win);
            stats.on_reward(reward);
            learner.observe(Transition {
                obs: last_obs,
                act: last_act.act,
                log_prob: last_act.log_prob,
                value: last_act.value,
                reward,
                is_done: done,
                next_obs: obs.clone(),
            })?;
        }

        let chosen = learner.choose_action(&obs)?;

        if done {
            stats.on_episode_end(obs.first().copied().unwrap_or(0.0));
            session.paused = true;
            Ok(StepOutcome {
                act: chosen.act,
                pause: true,
            })
        } else {
            session.last_obs = Some(obs);
            session.last_act = Some(chosen);
            Ok(StepOutcome {
                act: chosen.act,
                pause: false,
            })
        }
    }

    /// Handles one unpause poll from an agent.
    ///
    /// When every session is paused this is the trigger that admits a
    /// training cycle; the poll that wins the admission runs the cycle and
    /// reports `true`. Other polls report whether their own session is
    /// currently unpaused.
    pub fn check_unpause(&self, agent_id: &str) -> bool {
        if self.barrier.is_training() {
            return false;
        }

        let mut state = self.state.lock().unwrap();
        if state.sessions.all_paused() {
            if let Some(permit) = self.barrier.try_admit() {
                // Errors are logged inside the cycle; the agents are
                // released either way.
                let _ = self.run_cycle(&mut state);
                drop(permit);
                return true;
            }
        }

        state
            .sessions
            .get(agent_id)
            .map(|s| !s.paused)
            .unwrap_or(false)
    }

    /// Explicitly triggers a training cycle (single-agent deployments).
    pub fn trigger_training(&self) -> Result<(), HuddleError> {
        let mut state = self.state.lock().unwrap();
        let permit = self
            .barrier
            .try_admit()
            .ok_or(HuddleError::TrainingInProgress)?;
        let trained = self.run_cycle(&mut state)?;
        drop(permit);
        if trained {
            Ok(())
        } else {
            Err(HuddleError::NotReadyToTrain)
        }
    }

    /// Runs one admitted cycle: exactly one optimization pass, then the
    /// release of every session. Returns whether the learner actually
    /// trained.
    fn run_cycle(&self, state: &mut CoordinatorState<L>) -> Result<bool, HuddleError> {
        state.cycles += 1;
        let cycle = state.cycles;
        info!(
            "training cycle {} admitted with {} transitions",
            cycle,
            state.learner.n_transitions()
        );

        let result = state.learner.learn();
        // Release the agents regardless of the outcome.
        state.sessions.unpause_all();

        match result {
            Ok(Some(record)) => {
                let record = record.merge(state.stats.drain_record());
                info!("training cycle {} finished: {}", cycle, record.to_line());
                self.save_params(state, cycle);
                Ok(true)
            }
            Ok(None) => {
                info!(
                    "training cycle {} skipped: insufficient data ({} transitions)",
                    cycle,
                    state.learner.n_transitions()
                );
                Ok(false)
            }
            Err(e) => {
                error!("training cycle {} aborted: {:#}", cycle, e);
                Err(HuddleError::Learner(e))
            }
        }
    }

    fn save_params(&self, state: &CoordinatorState<L>, cycle: usize) {
        let model_dir = match &self.config.model_dir {
            Some(dir) => dir,
            None => return,
        };
        if self.config.save_interval == 0 || cycle % self.config.save_interval != 0 {
            return;
        }
        let path = Path::new(model_dir).join(cycle.to_string());
        match state.learner.save_params(&path) {
            Ok(()) => info!("saved learner parameters in {:?}", path),
            Err(e) => error!("failed to save learner parameters in {:?}: {:#}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChosenAction;
    use anyhow::Result;
    use std::sync::mpsc::{Receiver, SyncSender};
    use std::sync::{Arc, Barrier};

    /// Learner stub that records transitions and counts passes.
    struct StubLearner {
        transitions: Vec<Transition>,
        learn_calls: usize,
        min_transitions: usize,
        // Rendezvous used to hold a learn() call open from the test.
        gate: Option<(SyncSender<()>, Receiver<()>)>,
    }

    impl StubLearner {
        fn new(min_transitions: usize) -> Self {
            Self {
                transitions: Vec::new(),
                learn_calls: 0,
                min_transitions,
                gate: None,
            }
        }
    }

    impl Learner for StubLearner {
        fn n_actions(&self) -> usize {
            3
        }

        fn obs_dim(&self) -> usize {
            2
        }

        fn choose_action(&mut self, _obs: &[f32]) -> Result<ChosenAction> {
            Ok(ChosenAction {
                act: 1,
                log_prob: -0.5,
                value: 0.25,
            })
        }

        fn observe(&mut self, tr: Transition) -> Result<()> {
            self.transitions.push(tr);
            Ok(())
        }

        fn n_transitions(&self) -> usize {
            self.transitions.len()
        }

        fn learn(&mut self) -> Result<Option<Record>> {
            if let Some((started, resume)) = &self.gate {
                started.send(()).unwrap();
                resume.recv().unwrap();
            }
            if self.transitions.len() < self.min_transitions {
                return Ok(None);
            }
            self.learn_calls += 1;
            self.transitions.clear();
            Ok(Some(Record::empty()))
        }

        fn save_params(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn load_params(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn coordinator(min_transitions: usize) -> TrainingCoordinator<StubLearner> {
        TrainingCoordinator::build(
            CoordinatorConfig::default(),
            RewardShaping::default(),
            StubLearner::new(min_transitions),
        )
    }

    fn learner_of<R>(
        coordinator: &TrainingCoordinator<StubLearner>,
        f: impl FnOnce(&StubLearner) -> R,
    ) -> R {
        f(&coordinator.state.lock().unwrap().learner)
    }

    #[test]
    fn test_first_request_creates_no_transition() {
        let c = coordinator(1);
        let outcome = c.step("a", vec![0.10, 0.5], false, false).unwrap();
        assert!(!outcome.pause);
        assert!(outcome.act < 3);
        assert_eq!(learner_of(&c, |l| l.n_transitions()), 0);
    }

    #[test]
    fn test_second_request_registers_progress_delta_reward() {
        let c = coordinator(usize::MAX);
        c.step("a", vec![0.10, 0.5], false, false).unwrap();
        c.step("a", vec![0.15, 0.99], false, false).unwrap();

        learner_of(&c, |l| {
            assert_eq!(l.transitions.len(), 1);
            let tr = &l.transitions[0];
            assert!((tr.reward - 0.5).abs() < 1e-6);
            assert_eq!(tr.obs, vec![0.10, 0.5]);
            assert_eq!(tr.next_obs, vec![0.15, 0.99]);
            assert_eq!(tr.act, 1);
            assert!(!tr.is_done);
        });
    }

    #[test]
    fn test_win_gives_terminal_override_and_pauses() {
        let c = coordinator(usize::MAX);
        c.step("a", vec![0.10, 0.5], false, false).unwrap();
        let outcome = c.step("a", vec![0.95, 0.5], true, true).unwrap();
        assert!(outcome.pause);
        learner_of(&c, |l| {
            assert_eq!(l.transitions[0].reward, 1.0);
            assert!(l.transitions[0].is_done);
        });

        // The session cache was reset: the next request pairs nothing.
        c.step("a", vec![0.05, 0.5], false, false).unwrap();
        assert_eq!(learner_of(&c, |l| l.n_transitions()), 1);
    }

    #[test]
    fn test_malformed_observation_is_rejected() {
        let c = coordinator(1);
        match c.step("a", vec![0.1], false, false) {
            Err(HuddleError::ObservationLength { expected, got }) => {
                assert_eq!((expected, got), (2, 1));
            }
            other => panic!("unexpected: {:?}", other.map(|o| o.act)),
        }
        match c.step("a", vec![0.1, f32::NAN], false, false) {
            Err(HuddleError::ObservationNotFinite(1)) => {}
            other => panic!("unexpected: {:?}", other.map(|o| o.act)),
        }
    }

    #[test]
    fn test_barrier_liveness_with_three_sessions() {
        let c = coordinator(1);
        for id in ["a", "b", "c"].iter() {
            c.step(id, vec![0.10, 0.5], false, false).unwrap();
            let outcome = c.step(id, vec![0.20, 0.5], true, false).unwrap();
            assert!(outcome.pause);
        }

        // Not everyone paused yet would keep this false; here all three
        // are, so the poll runs exactly one pass and releases everyone.
        assert!(c.check_unpause("a"));
        learner_of(&c, |l| assert_eq!(l.learn_calls, 1));
        assert!(!c.is_training());
        for id in ["a", "b", "c"].iter() {
            assert!(c.check_unpause(id));
        }
        learner_of(&c, |l| assert_eq!(l.learn_calls, 1));
    }

    #[test]
    fn test_skipped_cycle_still_releases_sessions() {
        let c = coordinator(usize::MAX);
        c.step("a", vec![0.10, 0.5], false, false).unwrap();
        c.step("a", vec![0.20, 0.5], true, false).unwrap();

        assert!(c.check_unpause("a"));
        learner_of(&c, |l| assert_eq!(l.learn_calls, 0));
        assert!(c.check_unpause("a"));
    }

    #[test]
    fn test_unpause_poll_before_all_paused() {
        let c = coordinator(1);
        c.step("a", vec![0.10, 0.5], false, false).unwrap();
        c.step("b", vec![0.10, 0.5], false, false).unwrap();
        c.step("a", vec![0.20, 0.5], true, false).unwrap();

        // "b" is still running, so no cycle is admitted and "a" stays
        // paused while "b" reports unpaused.
        assert!(!c.check_unpause("a"));
        assert!(c.check_unpause("b"));
        assert!(!c.check_unpause("unknown"));
        learner_of(&c, |l| assert_eq!(l.learn_calls, 0));
    }

    #[test]
    fn test_concurrent_polls_admit_exactly_one_pass() {
        let c = Arc::new(coordinator(1));
        for id in ["a", "b", "c", "d"].iter() {
            c.step(id, vec![0.10, 0.5], false, false).unwrap();
            c.step(id, vec![0.20, 0.5], true, false).unwrap();
        }

        let start = Arc::new(Barrier::new(4));
        let handles: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| {
                let c = c.clone();
                let start = start.clone();
                let id = id.to_string();
                std::thread::spawn(move || {
                    start.wait();
                    c.check_unpause(&id)
                })
            })
            .collect();
        let released: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // One poll ran the cycle; the rest found their session released
        // (or raced ahead of the winner and reported still-paused, which
        // a client handles by polling again).
        learner_of(&c, |l| assert_eq!(l.learn_calls, 1));
        assert!(released.iter().any(|&r| r));
        assert!(!c.is_training());
    }

    #[test]
    fn test_action_request_during_training_is_rejected() {
        let c = coordinator(1);
        let (started_tx, started_rx) = std::sync::mpsc::sync_channel(0);
        let (resume_tx, resume_rx) = std::sync::mpsc::channel();
        c.state.lock().unwrap().learner.gate = Some((started_tx, resume_rx));
        let c = Arc::new(c);

        c.step("a", vec![0.10, 0.5], false, false).unwrap();
        c.step("a", vec![0.20, 0.5], true, false).unwrap();

        let trainer = {
            let c = c.clone();
            std::thread::spawn(move || c.check_unpause("a"))
        };

        // Wait until learn() is in flight, then poke the request path.
        started_rx.recv().unwrap();
        assert!(c.is_training());
        match c.step("a", vec![0.10, 0.5], false, false) {
            Err(HuddleError::TrainingInProgress) => {}
            other => panic!("unexpected: {:?}", other.map(|o| o.act)),
        }
        assert!(!c.check_unpause("a"));

        resume_tx.send(()).unwrap();
        assert!(trainer.join().unwrap());
        assert!(!c.is_training());
    }

    #[test]
    fn test_trigger_training_preconditions() {
        let c = coordinator(2);
        match c.trigger_training() {
            Err(HuddleError::NotReadyToTrain) => {}
            other => panic!("unexpected: {:?}", other.err()),
        }

        c.step("a", vec![0.10, 0.5], false, false).unwrap();
        c.step("a", vec![0.15, 0.5], false, false).unwrap();
        c.step("a", vec![0.20, 0.5], true, false).unwrap();
        c.trigger_training().unwrap();
        learner_of(&c, |l| assert_eq!(l.learn_calls, 1));
    }
}
