use rand::SeedableRng;
use rand::rngs::StdRng;

use super::episode::{EpisodeProgress, LearnerParams, check_observation};
use super::errors::SolverError;
use super::exploration::{EpsilonGreedy, greedy_action};
use super::table::QTable;
use super::traits::Solver;
use crate::env::Env;
use crate::update::{PolicySnapshot, UpdateRecord, ValueSnapshot};

/// Off-policy TD control: the target bootstraps from the best next action.
pub struct QLearning {
    params: LearnerParams,
    table: QTable,
    explorer: EpsilonGreedy,
    progress: EpisodeProgress,
    state: usize,
    rng: StdRng,
}

impl QLearning {
    pub fn new(params: LearnerParams, n_states: usize, n_actions: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            table: QTable::with_noise(n_states, n_actions, &mut rng),
            explorer: EpsilonGreedy::new(params.epsilon),
            progress: EpisodeProgress::new(&params),
            params,
            state: 0,
            rng,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }
}

impl Solver for QLearning {
    fn next_update(&mut self, env: &mut dyn Env) -> Result<Option<UpdateRecord>, SolverError> {
        if self.progress.is_exhausted() {
            return Ok(None);
        }
        let n_states = self.table.n_states();
        if !self.progress.in_episode() {
            self.state = check_observation(env.reset()?.observation, n_states)?;
            self.progress.begin();
        }

        let state = self.state;
        let action = self.explorer.select(self.table.row(state), &mut self.rng);
        let outcome = env.step(action)?;
        let next = check_observation(outcome.observation, n_states)?;

        let bootstrap = if outcome.done {
            0.0
        } else {
            self.table.max_value(next)
        };
        let target = outcome.reward + self.params.discount * bootstrap;
        self.table
            .nudge(state, action, target, self.params.learning_rate);

        let episode_over = self.progress.advance(outcome.reward, outcome.done);
        let snapshot = self
            .progress
            .wants_snapshot(episode_over)
            .then(|| (self.value_function(), self.policy()));
        let record = self
            .progress
            .record(action, outcome.reward, env.visual_state(), snapshot);

        if episode_over {
            self.progress.finish();
        } else {
            self.state = next;
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
