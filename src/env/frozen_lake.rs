use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use serde_json::json;

use super::errors::EnvError;
use super::traits::{Env, check_action, check_state};
use super::types::{EnvState, Transition};

const MAP_4X4: [&str; 4] = ["SFFF", "FHFH", "FFFH", "HFFG"];
const MAP_5X5: [&str; 5] = ["SFFFF", "FHFFF", "FFHFF", "FHHFF", "FFFFG"];
const MAP_8X8: [&str; 8] = [
    "SFFFFFFF", "FFFFFFFF", "FFFHFFFF", "FFFFFHFF", "FFFHFFFF", "FHHFFFHF", "FHFFHFHF",
    "FFFHFFFG",
];

const N_ACTIONS: usize = 4;
pub const ACTION_NAMES: [&str; N_ACTIONS] = ["LEFT", "DOWN", "RIGHT", "UP"];

/// Navigate the ice from `S` to `G` without falling into a hole `H`.
///
/// On slippery ice the agent moves in the intended direction or in one of
/// the two perpendicular directions, each with probability 1/3.
#[derive(Debug, Clone)]
pub struct FrozenLake {
    size: usize,
    desc: Vec<String>,
    slippery: bool,
    start: usize,
    goal: usize,
    holes: Vec<usize>,
    current: usize,
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl FrozenLake {
    pub const DEFAULT_SIZE: usize = 5;
    pub const DEFAULT_MAX_STEPS: usize = 100;

    pub fn new(size: usize, slippery: bool, seed: u64) -> Result<Self, EnvError> {
        let desc: &[&str] = match size {
            4 => &MAP_4X4,
            5 => &MAP_5X5,
            8 => &MAP_8X8,
            other => return Err(EnvError::UnsupportedSize(other)),
        };

        let mut start = 0;
        let mut goal = 0;
        let mut holes = Vec::new();
        for (row, line) in desc.iter().enumerate() {
            for (col, cell) in line.chars().enumerate() {
                let idx = row * size + col;
                match cell {
                    'S' => start = idx,
                    'G' => goal = idx,
                    'H' => holes.push(idx),
                    _ => {}
                }
            }
        }

        Ok(Self {
            size,
            desc: desc.iter().map(|line| line.to_string()).collect(),
            slippery,
            start,
            goal,
            holes,
            current: start,
            steps: 0,
            max_steps: Self::DEFAULT_MAX_STEPS,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn goal(&self) -> usize {
        self.goal
    }

    fn coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.size, idx % self.size)
    }

    fn is_terminal(&self, idx: usize) -> bool {
        idx == self.goal || self.holes.contains(&idx)
    }

    fn next_state(&self, state: usize, action: usize) -> usize {
        let (mut row, mut col) = self.coords(state);
        match action {
            0 => col = col.saturating_sub(1),
            1 => row = (row + 1).min(self.size - 1),
            2 => col = (col + 1).min(self.size - 1),
            _ => row = row.saturating_sub(1),
        }
        row * self.size + col
    }

    fn outcome(&self, next: usize) -> (f64, bool) {
        if next == self.goal {
            (1.0, true)
        } else {
            (0.0, self.holes.contains(&next))
        }
    }

    fn info(&self) -> serde_json::Value {
        let (row, col) = self.coords(self.current);
        json!({ "state_coords": [row, col] })
    }
}

impl Env for FrozenLake {
    fn reset(&mut self) -> Result<EnvState, EnvError> {
        self.current = self.start;
        self.steps = 0;
        Ok(EnvState::initial(self.current, self.info()))
    }

    fn step(&mut self, action: usize) -> Result<EnvState, EnvError> {
        let outcomes = self.transitions(self.current, action)?;
        self.steps += 1;

        let chosen = if outcomes.len() == 1 {
            outcomes[0]
        } else {
            let weights = WeightedIndex::new(outcomes.iter().map(|t| t.probability))
                .map_err(|e| EnvError::Other(Box::new(e)))?;
            outcomes[weights.sample(&mut self.rng)]
        };
        self.current = chosen.next_state;

        Ok(EnvState {
            observation: chosen.next_state,
            reward: chosen.reward,
            done: chosen.terminal || self.steps >= self.max_steps,
            info: self.info(),
        })
    }

    fn state_space_size(&self) -> usize {
        self.size * self.size
    }

    fn action_space_size(&self) -> usize {
        N_ACTIONS
    }

    fn render(&self) -> serde_json::Value {
        let holes: Vec<_> = self.holes.iter().map(|&h| self.coords(h)).collect();
        json!({
            "grid_size": self.size,
            "agent_position": self.coords(self.current),
            "goal_position": self.coords(self.goal),
            "start_position": self.coords(self.start),
            "holes": holes,
            "desc": self.desc,
        })
    }

    fn visual_state(&self) -> serde_json::Value {
        json!(self.current)
    }

    fn is_model_based(&self) -> bool {
        true
    }

    fn transitions(&self, state: usize, action: usize) -> Result<Vec<Transition>, EnvError> {
        check_state(state, self.state_space_size())?;
        check_action(action, N_ACTIONS)?;

        if self.is_terminal(state) {
            return Ok(vec![Transition::new(1.0, state, 0.0, true)]);
        }

        if !self.slippery {
            let next = self.next_state(state, action);
            let (reward, terminal) = self.outcome(next);
            return Ok(vec![Transition::new(1.0, next, reward, terminal)]);
        }

        let directions = [
            action,
            (action + N_ACTIONS - 1) % N_ACTIONS,
            (action + 1) % N_ACTIONS,
        ];
        Ok(directions
            .into_iter()
            .map(|dir| {
                let next = self.next_state(state, dir);
                let (reward, terminal) = self.outcome(next);
                Transition::new(1.0 / 3.0, next, reward, terminal)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_map() {
        let env = FrozenLake::new(5, false, 0).unwrap();
        assert_eq!(env.state_space_size(), 25);
        assert_eq!(env.goal(), 24);
        assert_eq!(env.holes, vec![6, 12, 16, 17]);
        assert!(FrozenLake::new(6, false, 0).is_err());
    }

    #[test]
    fn slippery_transitions_sum_to_one() {
        let env = FrozenLake::new(4, true, 0).unwrap();
        for state in 0..env.state_space_size() {
            for action in 0..N_ACTIONS {
                let total: f64 = env
                    .transitions(state, action)
                    .unwrap()
                    .iter()
                    .map(|t| t.probability)
                    .sum();
                assert!((total - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn deterministic_ice_follows_action() {
        let mut env = FrozenLake::new(5, false, 7).unwrap();
        env.reset().unwrap();
        let right = env.step(2).unwrap();
        assert_eq!(right.observation, 1);
        let down = env.step(1).unwrap();
        assert_eq!(down.observation, 6);
        assert!(down.done, "state 6 is a hole");
        assert_eq!(down.reward, 0.0);
    }

    #[test]
    fn slippery_steps_stay_within_outcomes() {
        let mut env = FrozenLake::new(4, true, 42).unwrap();
        for _ in 0..50 {
            env.reset().unwrap();
            let allowed: Vec<usize> = env
                .transitions(0, 2)
                .unwrap()
                .iter()
                .map(|t| t.next_state)
                .collect();
            let state = env.step(2).unwrap();
            assert!(allowed.contains(&state.observation));
        }
    }
}
