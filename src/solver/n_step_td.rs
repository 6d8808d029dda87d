use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;

use super::episode::{EpisodeProgress, LearnerParams, check_observation};
use super::errors::SolverError;
use super::exploration::{EpsilonGreedy, greedy_action};
use super::table::QTable;
use super::traits::Solver;
use crate::env::Env;
use crate::update::{PolicySnapshot, UpdateRecord, ValueSnapshot};

#[derive(Debug, Clone, Copy)]
struct Visit {
    state: usize,
    action: usize,
    reward: f64,
}

/// n-step TD control over a sliding window of the last `n` steps.
///
/// Each step updates the entry `n` steps behind with the truncated n-step
/// return, bootstrapped from `Q` at the far end of the window. When the
/// episode ends the window is drained so that every buffered step receives
/// its update before the terminal record is emitted. With `n = 1` this is
/// one-step TD(0) control.
pub struct NStepTd {
    params: LearnerParams,
    n: usize,
    table: QTable,
    explorer: EpsilonGreedy,
    progress: EpisodeProgress,
    window: VecDeque<Visit>,
    state: usize,
    action: usize,
    rng: StdRng,
}

impl NStepTd {
    pub fn new(
        params: LearnerParams,
        n: usize,
        n_states: usize,
        n_actions: usize,
        seed: u64,
    ) -> Self {
        let n = n.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            table: QTable::with_noise(n_states, n_actions, &mut rng),
            explorer: EpsilonGreedy::new(params.epsilon),
            progress: EpisodeProgress::new(&params),
            window: VecDeque::with_capacity(n),
            params,
            n,
            state: 0,
            action: 0,
            rng,
        }
    }

    /// TD(0).
    pub fn one_step(params: LearnerParams, n_states: usize, n_actions: usize, seed: u64) -> Self {
        Self::new(params, 1, n_states, n_actions, seed)
    }

    pub fn lookahead(&self) -> usize {
        self.n
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// Updates the oldest buffered step with the discounted rewards in the
    /// window plus, if given, `gamma^len * Q(s, a)` of the bootstrap pair.
    fn update_oldest(&mut self, bootstrap: Option<(usize, usize)>) {
        let discount = self.params.discount;
        let mut weight = 1.0;
        let mut target = 0.0;
        for visit in &self.window {
            target += weight * visit.reward;
            weight *= discount;
        }
        if let Some((state, action)) = bootstrap {
            target += weight * self.table.get(state, action);
        }

        if let Some(oldest) = self.window.pop_front() {
            self.table.nudge(
                oldest.state,
                oldest.action,
                target,
                self.params.learning_rate,
            );
        }
    }
}

impl Solver for NStepTd {
    fn next_update(&mut self, env: &mut dyn Env) -> Result<Option<UpdateRecord>, SolverError> {
        if self.progress.is_exhausted() {
            return Ok(None);
        }
        let n_states = self.table.n_states();
        if !self.progress.in_episode() {
            self.state = check_observation(env.reset()?.observation, n_states)?;
            self.action = self.explorer.select(self.table.row(self.state), &mut self.rng);
            self.window.clear();
            self.progress.begin();
        }

        let (state, action) = (self.state, self.action);
        let outcome = env.step(action)?;
        let next = check_observation(outcome.observation, n_states)?;
        self.window.push_back(Visit {
            state,
            action,
            reward: outcome.reward,
        });

        let episode_over = self.progress.advance(outcome.reward, outcome.done);
        if episode_over {
            while !self.window.is_empty() {
                self.update_oldest(None);
            }
        } else {
            let next_action = self.explorer.select(self.table.row(next), &mut self.rng);
            if self.window.len() >= self.n {
                self.update_oldest(Some((next, next_action)));
            }
            self.state = next;
            self.action = next_action;
        }

        let snapshot = self
            .progress
            .wants_snapshot(episode_over)
            .then(|| (self.value_function(), self.policy()));
        let record = self
            .progress
            .record(action, outcome.reward, env.visual_state(), snapshot);

        if episode_over {
            self.progress.finish();
        }
        Ok(Some(record))
    }

    fn value_function(&self) -> ValueSnapshot {
        self.table.value_snapshot()
    }

    fn policy(&mut self) -> PolicySnapshot {
        self.table.policy_snapshot(&mut self.rng)
    }

    fn select_action(&mut self, state: usize) -> usize {
        greedy_action(self.table.row(state), &mut self.rng)
    }

    fn is_finished(&self) -> bool {
        self.progress.is_exhausted()
    }
}
