use rand::SeedableRng;
use rand::rngs::StdRng;

use super::errors::SolverError;
use super::exploration::greedy_action;
use super::planning::{Model, THETA};
use super::traits::Solver;
use crate::env::Env;
use crate::update::{Checkpoint, PolicySnapshot, UpdateRecord, ValueSnapshot};

/// Evaluation stops after this many sweeps even if it has not converged,
/// which only happens for undiscounted models with non-terminating cycles.
pub const MAX_EVALUATION_SWEEPS: usize = 10_000;

const TIE_TOLERANCE: f64 = 1e-12;

/// Alternates full policy evaluation with greedy policy improvement.
/// Each call to `next_update` runs one evaluation/improvement round.
pub struct PolicyIteration {
    model: Model,
    discount: f64,
    max_iterations: usize,
    values: Vec<f64>,
    policy: Vec<usize>,
    iteration: usize,
    stable: bool,
    rng: StdRng,
}

impl PolicyIteration {
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
            values: vec![0.0; n_states],
            policy: vec![0; n_states],
            iteration: 0,
            stable: false,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn value_table(&self) -> &[f64] {
        &self.values
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// In-place sweeps under the current policy until the largest change
    /// drops below [`THETA`]. Returns the number of sweeps run.
    fn evaluate(&mut self) -> usize {
        for sweep in 1..=MAX_EVALUATION_SWEEPS {
            let mut delta: f64 = 0.0;
            for state in 0..self.model.n_states() {
                let value = self.model.expected_value(
                    state,
                    self.policy[state],
                    &self.values,
                    self.discount,
                );
                delta = delta.max((value - self.values[state]).abs());
                self.values[state] = value;
            }
            if delta < THETA {
                return sweep;
            }
        }
        tracing::warn!(
            sweeps = MAX_EVALUATION_SWEEPS,
            "policy evaluation stopped before converging"
        );
        MAX_EVALUATION_SWEEPS
    }

    /// Greedy improvement. An action that still attains the maximum is kept,
    /// so the policy cannot oscillate between equally good actions. Returns
    /// whether any state changed its action.
    fn improve(&mut self) -> bool {
        let mut changed = false;
        for state in 0..self.model.n_states() {
            let q = self.model.action_values(state, &self.values, self.discount);
            let best = q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let current = self.policy[state];
            if q[current] >= best - TIE_TOLERANCE {
                continue;
            }
            self.policy[state] = greedy_action(&q, &mut self.rng);
            changed = true;
        }
        changed
    }
}

impl Solver for PolicyIteration {
    fn next_update(&mut self, _env: &mut dyn Env) -> Result<Option<UpdateRecord>, SolverError> {
        if self.is_finished() {
            return Ok(None);
        }

        let sweeps = self.evaluate();
        self.stable = !self.improve();
        let index = self.iteration;
        self.iteration += 1;
        tracing::debug!(
            iteration = self.iteration,
            sweeps,
            stable = self.stable,
            "policy iteration round"
        );

        let snapshot = Checkpoint::POLICY_ITERATION
            .is_due(index, self.is_finished())
            .then(|| (self.value_function(), self.policy()));
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
        self.stable || self.iteration >= self.max_iterations
    }
}
