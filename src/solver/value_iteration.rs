use rand::SeedableRng;
use rand::rngs::StdRng;

use super::errors::SolverError;
use super::exploration::greedy_action;
use super::planning::{Model, THETA};
use super::traits::Solver;
use crate::env::Env;
use crate::update::{Checkpoint, PolicySnapshot, UpdateRecord, ValueSnapshot};

/// Bellman optimality sweeps until the largest per-state change drops
/// below [`THETA`] or the iteration budget runs out.
///
/// Only checkpoint iterations produce a record, so one call to
/// `next_update` may run several sweeps.
pub struct ValueIteration {
    model: Model,
    discount: f64,
    max_iterations: usize,
    checkpoint: Checkpoint,
    values: Vec<f64>,
    policy: Vec<usize>,
    iteration: usize,
    converged: bool,
    rng: StdRng,
}

impl ValueIteration {
    pub fn new(
        env: &dyn Env,
        discount: f64,
        max_iterations: usize,
        seed: u64,
    ) -> Result<Self, SolverError> {
        let model = Model::from_env(env)?;
        let n_states = model.n_states();
        Ok(Self {
            model,
            discount,
            max_iterations,
            checkpoint: Checkpoint::VALUE_ITERATION,
            values: vec![0.0; n_states],
            policy: vec![0; n_states],
            iteration: 0,
            converged: false,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn value_table(&self) -> &[f64] {
        &self.values
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn has_converged(&self) -> bool {
        self.converged
    }

    fn sweep(&mut self) -> f64 {
        let mut delta: f64 = 0.0;
        for state in 0..self.model.n_states() {
            let best = self
                .model
                .action_values(state, &self.values, self.discount)
                .into_iter()
                .fold(f64::NEG_INFINITY, f64::max);
            delta = delta.max((best - self.values[state]).abs());
            self.values[state] = best;
        }
        delta
    }

    fn extract_policy(&mut self) {
        for state in 0..self.model.n_states() {
            let q = self.model.action_values(state, &self.values, self.discount);
            self.policy[state] = greedy_action(&q, &mut self.rng);
        }
    }
}

impl Solver for ValueIteration {
    fn next_update(&mut self, _env: &mut dyn Env) -> Result<Option<UpdateRecord>, SolverError> {
        if self.is_finished() {
            return Ok(None);
        }

        loop {
            let delta = self.sweep();
            let index = self.iteration;
            self.iteration += 1;
            self.converged = delta < THETA;
            if self.checkpoint.is_due(index, self.is_finished()) {
                tracing::debug!(iteration = self.iteration, delta, "value iteration checkpoint");
                break;
            }
        }
        self.extract_policy();

        let snapshot = Some((self.value_function(), self.policy()));
        Ok(Some(
            UpdateRecord {
                episode: self.iteration,
                step: 0,
                reward: 0.0,
                cumulative_reward: self.values.iter().sum(),
                state: serde_json::json!(0),
                action: 0,
                value_function: None,
                policy: None,
            }
            .with_snapshot(snapshot),
        ))
    }

    fn value_function(&self) -> ValueSnapshot {
        ValueSnapshot(self.values.clone())
    }

    fn policy(&mut self) -> PolicySnapshot {
        PolicySnapshot(self.policy.clone())
    }

    fn select_action(&mut self, state: usize) -> usize {
        self.policy.get(state).copied().unwrap_or(0)
    }

    fn is_finished(&self) -> bool {
        self.converged || self.iteration >= self.max_iterations
    }
}
