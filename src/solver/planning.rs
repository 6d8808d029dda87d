use super::errors::SolverError;
use crate::env::{Env, Transition};

/// Largest per-state value change below which a sweep counts as converged.
pub const THETA: f64 = 1e-6;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Transition model of an environment, read once when a planner is built.
#[derive(Debug, Clone)]
pub(crate) struct Model {
    n_states: usize,
    n_actions: usize,
    /// Outcomes of `(s, a)` at `s * n_actions + a`.
    outcomes: Vec<Vec<Transition>>,
}

impl Model {
    pub(crate) fn from_env(env: &dyn Env) -> Result<Self, SolverError> {
        let n_states = env.state_space_size();
        let n_actions = env.action_space_size();
        if n_states == 0 {
            return Err(SolverError::EmptySpace("state"));
        }
        if n_actions == 0 {
            return Err(SolverError::EmptySpace("action"));
        }

        let mut outcomes = Vec::with_capacity(n_states * n_actions);
        for state in 0..n_states {
            for action in 0..n_actions {
                let transitions = env.transitions(state, action)?;
                check_outcomes(state, action, &transitions, n_states)?;
                outcomes.push(transitions);
            }
        }

        Ok(Self {
            n_states,
            n_actions,
            outcomes,
        })
    }

    pub(crate) fn n_states(&self) -> usize {
        self.n_states
    }

    pub(crate) fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// `sum p * (r + discount * V(s') * (1 - terminal))` over the outcomes of
    /// `(state, action)`.
    pub(crate) fn expected_value(
        &self,
        state: usize,
        action: usize,
        values: &[f64],
        discount: f64,
    ) -> f64 {
        self.outcomes[state * self.n_actions + action]
            .iter()
            .map(|t| {
                let future = if t.terminal {
                    0.0
                } else {
                    discount * values[t.next_state]
                };
                t.probability * (t.reward + future)
            })
            .sum()
    }

    pub(crate) fn action_values(&self, state: usize, values: &[f64], discount: f64) -> Vec<f64> {
        (0..self.n_actions)
            .map(|action| self.expected_value(state, action, values, discount))
            .collect()
    }
}

fn check_outcomes(
    state: usize,
    action: usize,
    transitions: &[Transition],
    n_states: usize,
) -> Result<(), SolverError> {
    if let Some(t) = transitions.iter().find(|t| t.next_state >= n_states) {
        return Err(SolverError::InvalidModel(format!(
            "({state}, {action}) leads to state {} outside 0..{n_states}",
            t.next_state
        )));
    }
    if transitions.iter().any(|t| t.probability < 0.0) {
        return Err(SolverError::InvalidModel(format!(
            "({state}, {action}) has a negative probability"
        )));
    }
    let total: f64 = transitions.iter().map(|t| t.probability).sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(SolverError::InvalidModel(format!(
            "probabilities of ({state}, {action}) sum to {total}"
        )));
    }
    Ok(())
}
