use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::episode::{EpisodeProgress, LearnerParams, check_observation};
use super::errors::SolverError;
use super::exploration::{EpsilonGreedy, greedy_action};
use super::table::QTable;
use super::traits::Solver;
use crate::env::Env;
use crate::update::{PolicySnapshot, UpdateRecord, ValueSnapshot};

/// Discounted return from every step to the end of the episode,
/// accumulated backwards: `G_t = r_t + discount * G_{t+1}`.
pub fn episode_returns(rewards: &[f64], discount: f64) -> Vec<f64> {
    let mut returns = vec![0.0; rewards.len()];
    let mut g = 0.0;
    for (t, reward) in rewards.iter().enumerate().rev() {
        g = discount * g + reward;
        returns[t] = g;
    }
    returns
}

/// Marks the steps that receive a return. Every step does in every-visit
/// mode. In first-visit mode the episode is scanned backwards and a pair is
/// credited the first time the scan meets it, i.e. at its last occurrence
/// in time.
pub fn credited_steps(pairs: &[(usize, usize)], first_visit: bool) -> Vec<bool> {
    if !first_visit {
        return vec![true; pairs.len()];
    }
    let mut seen = HashSet::with_capacity(pairs.len());
    let mut credited = vec![false; pairs.len()];
    for (t, pair) in pairs.iter().enumerate().rev() {
        credited[t] = seen.insert(*pair);
    }
    credited
}

#[derive(Debug, Clone, Copy, Default)]
struct ReturnStats {
    sum: f64,
    count: u64,
}

impl ReturnStats {
    fn push(&mut self, g: f64) -> f64 {
        self.sum += g;
        self.count += 1;
        self.sum / self.count as f64
    }
}

/// Monte Carlo control with an epsilon-greedy behaviour policy.
///
/// Steps are streamed as they happen, but the table only changes once the
/// episode ends. Each credited pair's entry is the mean of every return it
/// has received across all episodes.
pub struct MonteCarlo {
    params: LearnerParams,
    first_visit: bool,
    table: QTable,
    explorer: EpsilonGreedy,
    progress: EpisodeProgress,
    pairs: Vec<(usize, usize)>,
    rewards: Vec<f64>,
    returns: Vec<ReturnStats>,
    state: usize,
    rng: StdRng,
}

impl MonteCarlo {
    pub fn new(
        params: LearnerParams,
        first_visit: bool,
        n_states: usize,
        n_actions: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            table: QTable::with_noise(n_states, n_actions, &mut rng),
            explorer: EpsilonGreedy::new(params.epsilon),
            progress: EpisodeProgress::new(&params),
            pairs: Vec::new(),
            rewards: Vec::new(),
            returns: vec![ReturnStats::default(); n_states * n_actions],
            params,
            first_visit,
            state: 0,
            rng,
        }
    }

    pub fn first_visit(&self) -> bool {
        self.first_visit
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    fn learn_from_episode(&mut self) {
        let returns = episode_returns(&self.rewards, self.params.discount);
        let credited = credited_steps(&self.pairs, self.first_visit);
        let n_actions = self.table.n_actions();

        // latest steps first, matching the order returns are accumulated in
        let steps = self.pairs.iter().zip(returns).zip(credited).rev();
        for ((&(state, action), g), credit) in steps {
            if !credit {
                continue;
            }
            let mean = self.returns[state * n_actions + action].push(g);
            self.table.set(state, action, mean);
        }
        self.pairs.clear();
        self.rewards.clear();
    }
}

impl Solver for MonteCarlo {
    fn next_update(&mut self, env: &mut dyn Env) -> Result<Option<UpdateRecord>, SolverError> {
        if self.progress.is_exhausted() {
            return Ok(None);
        }
        let n_states = self.table.n_states();
        if !self.progress.in_episode() {
            self.state = check_observation(env.reset()?.observation, n_states)?;
            self.pairs.clear();
            self.rewards.clear();
            self.progress.begin();
        }

        let state = self.state;
        let action = self.explorer.select(self.table.row(state), &mut self.rng);
        let outcome = env.step(action)?;
        let next = check_observation(outcome.observation, n_states)?;
        self.pairs.push((state, action));
        self.rewards.push(outcome.reward);

        let episode_over = self.progress.advance(outcome.reward, outcome.done);
        if episode_over {
            self.learn_from_episode();
        } else {
            self.state = next;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::GridWorld;

    #[test]
    fn returns_accumulate_backwards() {
        let returns = episode_returns(&[1.0, 0.0, 2.0], 0.5);
        assert_eq!(returns, vec![1.5, 1.0, 2.0]);
        assert!(episode_returns(&[], 0.9).is_empty());
    }

    #[test]
    fn first_visit_credits_latest_occurrence() {
        let pairs = [(0, 1), (1, 0), (0, 1), (2, 2), (1, 0)];
        assert_eq!(
            credited_steps(&pairs, true),
            vec![false, false, true, true, true]
        );
        assert_eq!(credited_steps(&pairs, false), vec![true; 5]);
    }

    #[test]
    fn visit_modes_agree_without_repeats() {
        let pairs = [(0, 1), (1, 1), (2, 2)];
        assert_eq!(credited_steps(&pairs, true), credited_steps(&pairs, false));
    }

    #[test]
    fn every_visit_averages_repeated_pairs() {
        // UP from the corner keeps the agent at state 0 so the pair repeats
        let params = LearnerParams {
            discount: 1.0,
            learning_rate: 0.1,
            epsilon: 0.0,
            n_episodes: 1,
            max_steps: 2,
        };
        let run = |first_visit| {
            let mut env = GridWorld::new(3);
            let mut solver = MonteCarlo::new(params, first_visit, 9, 4, 0);
            solver.table = QTable::zeros(9, 4);
            solver.table.set(0, 0, 1e-3);
            while solver.next_update(&mut env).unwrap().is_some() {}
            solver.table.get(0, 0)
        };

        // returns are G_0 = -0.02 and G_1 = -0.01; first-visit keeps G_1
        assert!((run(true) - -0.01).abs() < 1e-12);
        assert!((run(false) - -0.015).abs() < 1e-12);
    }

    #[test]
    fn table_is_untouched_until_episode_end() {
        let params = LearnerParams {
            discount: 0.9,
            learning_rate: 0.1,
            epsilon: 0.0,
            n_episodes: 1,
            max_steps: 3,
        };
        let mut env = GridWorld::new(3);
        let mut solver = MonteCarlo::new(params, true, 9, 4, 2);
        let before = solver.table().clone();

        let first = solver.next_update(&mut env).unwrap().unwrap();
        assert!(!first.has_snapshot());
        assert_eq!(solver.table(), &before);

        solver.next_update(&mut env).unwrap();
        let last = solver.next_update(&mut env).unwrap().unwrap();
        assert_eq!(last.step, 3);
        assert!(last.has_snapshot());
        assert_ne!(solver.table(), &before);
        assert!(solver.first_visit());
    }
}
