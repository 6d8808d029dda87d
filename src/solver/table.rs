use rand::Rng;

use super::exploration::greedy_action;
use crate::update::{PolicySnapshot, ValueSnapshot};

const INIT_NOISE: f64 = 0.01;

/// Dense `Q(s, a)` table, row-major by state.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    n_states: usize,
    n_actions: usize,
    values: Vec<f64>,
}

impl QTable {
    pub fn zeros(n_states: usize, n_actions: usize) -> Self {
        Self {
            n_states,
            n_actions,
            values: vec![0.0; n_states * n_actions],
        }
    }

    /// Small uniform noise in `[-0.01, 0.01)` so that untrained states do
    /// not all tie.
    pub fn with_noise<R: Rng + ?Sized>(n_states: usize, n_actions: usize, rng: &mut R) -> Self {
        let values = (0..n_states * n_actions)
            .map(|_| rng.gen_range(-INIT_NOISE..INIT_NOISE))
            .collect();
        Self {
            n_states,
            n_actions,
            values,
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Action values of `state`; empty when `state` is outside the table.
    pub fn row(&self, state: usize) -> &[f64] {
        if state >= self.n_states {
            return &[];
        }
        let start = state * self.n_actions;
        &self.values[start..start + self.n_actions]
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[state * self.n_actions + action]
    }

    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        self.values[state * self.n_actions + action] = value;
    }

    /// Moves `Q(s, a)` towards `target` by `step_size`.
    pub fn nudge(&mut self, state: usize, action: usize, target: f64, step_size: f64) {
        let current = self.get(state, action);
        self.set(state, action, current + step_size * (target - current));
    }

    pub fn max_value(&self, state: usize) -> f64 {
        self.row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn value_snapshot(&self) -> ValueSnapshot {
        ValueSnapshot((0..self.n_states).map(|s| self.max_value(s)).collect())
    }

    pub fn policy_snapshot<R: Rng + ?Sized>(&self, rng: &mut R) -> PolicySnapshot {
        PolicySnapshot(
            (0..self.n_states)
                .map(|s| greedy_action(self.row(s), rng))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn noise_is_small_and_seeded() {
        let a = QTable::with_noise(4, 3, &mut StdRng::seed_from_u64(5));
        let b = QTable::with_noise(4, 3, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
        assert!(a.values.iter().all(|v| v.abs() <= INIT_NOISE));
    }

    #[test]
    fn nudge_moves_towards_target() {
        let mut table = QTable::zeros(2, 2);
        table.nudge(1, 0, 1.0, 0.5);
        assert_eq!(table.get(1, 0), 0.5);
        table.nudge(1, 0, 1.0, 1.0);
        assert_eq!(table.get(1, 0), 1.0);
        assert_eq!(table.row(1), &[1.0, 0.0]);
    }

    #[test]
    fn rows_outside_the_table_are_empty() {
        let table = QTable::zeros(2, 3);
        assert!(table.row(2).is_empty());
        assert!(table.row(usize::MAX).is_empty());
        assert_eq!(greedy_action(table.row(7), &mut StdRng::seed_from_u64(0)), 0);
    }

    #[test]
    fn snapshots_follow_row_maxima() {
        let mut table = QTable::zeros(2, 3);
        table.set(0, 2, 0.4);
        table.set(1, 0, -0.2);
        table.set(1, 1, -0.1);
        table.set(1, 2, -0.3);

        assert_eq!(table.value_snapshot(), ValueSnapshot(vec![0.4, -0.1]));
        let policy = table.policy_snapshot(&mut StdRng::seed_from_u64(0));
        assert_eq!(policy, PolicySnapshot(vec![2, 1]));
    }
}
