use serde_json::json;

use super::errors::EnvError;
use super::traits::{Env, check_action, check_state};
use super::types::{EnvState, Transition};

const STEP_REWARD: f64 = -0.01;
const GOAL_REWARD: f64 = 1.0;
const HOLE_REWARD: f64 = -1.0;

// UP, RIGHT, DOWN, LEFT
const MOVES: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
pub const ACTION_NAMES: [&str; 4] = ["UP", "RIGHT", "DOWN", "LEFT"];

/// Deterministic grid navigation from the top-left corner to the
/// bottom-right goal.
#[derive(Debug, Clone)]
pub struct GridWorld {
    size: usize,
    holes: Vec<usize>,
    start: usize,
    goal: usize,
    current: usize,
    steps: usize,
    max_steps: usize,
}

impl GridWorld {
    pub const DEFAULT_SIZE: usize = 5;
    pub const DEFAULT_MAX_STEPS: usize = 100;

    /// Size 4 comes with a preset hole layout, every other size is open.
    pub fn new(size: usize) -> Self {
        let holes = if size == 4 {
            vec![(1, 1), (1, 3), (2, 3), (3, 0)]
        } else {
            Vec::new()
        };
        Self::with_holes(size, &holes)
    }

    /// Number of states of a `size` grid, `None` when it overflows.
    pub fn state_count(size: usize) -> Option<usize> {
        size.max(1).checked_mul(size.max(1))
    }

    pub fn with_holes(size: usize, holes: &[(usize, usize)]) -> Self {
        let size = size.max(1);
        let goal = size.saturating_mul(size) - 1;
        let holes = holes
            .iter()
            .filter(|&&(row, col)| row < size && col < size)
            .map(|&(row, col)| row * size + col)
            .filter(|&idx| idx != 0 && idx != goal)
            .collect();
        Self {
            size,
            holes,
            start: 0,
            goal,
            current: 0,
            steps: 0,
            max_steps: Self::DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn size(&self) -> usize {
        self.size
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
        let (row, col) = self.coords(state);
        let (dr, dc) = MOVES[action];
        let last = self.size as isize - 1;
        let row = (row as isize + dr).clamp(0, last) as usize;
        let col = (col as isize + dc).clamp(0, last) as usize;
        row * self.size + col
    }

    fn outcome(&self, next: usize) -> (f64, bool) {
        if next == self.goal {
            (GOAL_REWARD, true)
        } else if self.holes.contains(&next) {
            (HOLE_REWARD, true)
        } else {
            (STEP_REWARD, false)
        }
    }

    fn info(&self) -> serde_json::Value {
        let (row, col) = self.coords(self.current);
        json!({ "state_coords": [row, col] })
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl Env for GridWorld {
    fn reset(&mut self) -> Result<EnvState, EnvError> {
        self.current = self.start;
        self.steps = 0;
        Ok(EnvState::initial(self.current, self.info()))
    }

    fn step(&mut self, action: usize) -> Result<EnvState, EnvError> {
        check_action(action, MOVES.len())?;
        self.steps += 1;

        let next = self.next_state(self.current, action);
        let (reward, terminal) = self.outcome(next);
        self.current = next;

        Ok(EnvState {
            observation: next,
            reward,
            done: terminal || self.steps >= self.max_steps,
            info: self.info(),
        })
    }

    fn state_space_size(&self) -> usize {
        self.size.saturating_mul(self.size)
    }

    fn action_space_size(&self) -> usize {
        MOVES.len()
    }

    fn render(&self) -> serde_json::Value {
        let holes: Vec<_> = self.holes.iter().map(|&h| self.coords(h)).collect();
        json!({
            "grid_size": self.size,
            "agent_position": self.coords(self.current),
            "goal_position": self.coords(self.goal),
            "holes": holes,
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
        check_action(action, MOVES.len())?;

        // goal and holes are absorbing
        if self.is_terminal(state) {
            return Ok(vec![Transition::new(1.0, state, 0.0, true)]);
        }

        let next = self.next_state(state, action);
        let (reward, terminal) = self.outcome(next);
        Ok(vec![Transition::new(1.0, next, reward, terminal)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walls_keep_agent_inside() {
        let mut env = GridWorld::new(3);
        env.reset().unwrap();
        let up = env.step(0).unwrap();
        assert_eq!(up.observation, 0);
        assert_eq!(up.reward, STEP_REWARD);
        let left = env.step(3).unwrap();
        assert_eq!(left.observation, 0);
    }

    #[test]
    fn reaches_goal_on_shortest_path() {
        let mut env = GridWorld::new(3);
        env.reset().unwrap();
        let mut last = None;
        for action in [1, 1, 2, 2] {
            last = Some(env.step(action).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.observation, env.goal());
        assert_eq!(last.reward, GOAL_REWARD);
        assert!(last.done);
    }

    #[test]
    fn preset_holes_terminate_episode() {
        let mut env = GridWorld::new(4);
        env.reset().unwrap();
        env.step(1).unwrap();
        let hole = env.step(2).unwrap();
        assert_eq!(hole.observation, 5);
        assert_eq!(hole.reward, HOLE_REWARD);
        assert!(hole.done);
    }

    #[test]
    fn episode_is_capped() {
        let mut env = GridWorld::new(3).with_max_steps(2);
        env.reset().unwrap();
        assert!(!env.step(0).unwrap().done);
        assert!(env.step(0).unwrap().done);
    }

    #[test]
    fn transitions_are_deterministic_and_absorbing_at_goal() {
        let env = GridWorld::new(3);
        let from_start = env.transitions(0, 1).unwrap();
        assert_eq!(from_start, vec![Transition::new(1.0, 1, STEP_REWARD, false)]);

        let at_goal = env.transitions(env.goal(), 0).unwrap();
        assert_eq!(at_goal, vec![Transition::new(1.0, env.goal(), 0.0, true)]);

        assert!(matches!(
            env.transitions(0, 9),
            Err(EnvError::InvalidAction { .. })
        ));
    }
}
