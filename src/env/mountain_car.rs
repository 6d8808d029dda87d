use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::binning::{bin_index, combine, linspace};
use super::errors::EnvError;
use super::traits::{Env, check_action};
use super::types::EnvState;

const MIN_POSITION: f64 = -1.2;
const MAX_POSITION: f64 = 0.6;
const MAX_SPEED: f64 = 0.07;
const GOAL_POSITION: f64 = 0.5;
const FORCE: f64 = 0.001;
const GRAVITY: f64 = 0.0025;

pub const ACTION_NAMES: [&str; 3] = ["LEFT", "STAY", "RIGHT"];

/// Under-powered car in a valley that has to rock back and forth to reach
/// the flag on the right hill. Position and velocity are binned into one
/// discrete index; not model-based.
#[derive(Debug, Clone)]
pub struct MountainCar {
    n_bins: usize,
    position_edges: Vec<f64>,
    velocity_edges: Vec<f64>,
    // position, velocity
    state: [f64; 2],
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl MountainCar {
    pub const DEFAULT_BINS: usize = 20;
    pub const DEFAULT_MAX_STEPS: usize = 200;

    pub fn new(n_bins: usize, seed: u64) -> Self {
        let n_bins = n_bins.max(1);
        Self {
            n_bins,
            position_edges: linspace(MIN_POSITION, MAX_POSITION, n_bins),
            velocity_edges: linspace(-MAX_SPEED, MAX_SPEED, n_bins),
            state: [-0.5, 0.0],
            steps: 0,
            max_steps: Self::DEFAULT_MAX_STEPS,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of discrete states for `n_bins`, `None` when it overflows.
    pub fn state_count(n_bins: usize) -> Option<usize> {
        n_bins.max(1).checked_add(1)?.checked_pow(2)
    }

    pub fn continuous_state(&self) -> [f64; 2] {
        self.state
    }

    fn discretize(&self) -> usize {
        let [position, velocity] = self.state;
        combine(
            [
                bin_index(position, &self.position_edges),
                bin_index(velocity, &self.velocity_edges),
            ],
            self.n_bins.saturating_add(1),
        )
    }

    fn info(&self) -> serde_json::Value {
        json!({ "continuous_state": self.state })
    }
}

impl Default for MountainCar {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BINS, 0)
    }
}

impl Env for MountainCar {
    fn reset(&mut self) -> Result<EnvState, EnvError> {
        self.state = [self.rng.gen_range(-0.6..-0.4), 0.0];
        self.steps = 0;
        Ok(EnvState::initial(self.discretize(), self.info()))
    }

    fn step(&mut self, action: usize) -> Result<EnvState, EnvError> {
        check_action(action, ACTION_NAMES.len())?;
        self.steps += 1;

        let [position, velocity] = self.state;
        let push = action as f64 - 1.0;
        let velocity =
            (velocity + push * FORCE - (3.0 * position).cos() * GRAVITY).clamp(-MAX_SPEED, MAX_SPEED);
        let position = (position + velocity).clamp(MIN_POSITION, MAX_POSITION);
        // the left wall is inelastic
        let velocity = if position <= MIN_POSITION && velocity < 0.0 {
            0.0
        } else {
            velocity
        };
        self.state = [position, velocity];

        let reached = position >= GOAL_POSITION && velocity >= 0.0;
        Ok(EnvState {
            observation: self.discretize(),
            reward: -1.0,
            done: reached || self.steps >= self.max_steps,
            info: self.info(),
        })
    }

    fn state_space_size(&self) -> usize {
        self.n_bins.saturating_add(1).saturating_pow(2)
    }

    fn action_space_size(&self) -> usize {
        ACTION_NAMES.len()
    }

    fn render(&self) -> serde_json::Value {
        json!({
            "position": self.state[0],
            "velocity": self.state[1],
            "goal_position": GOAL_POSITION,
        })
    }

    fn visual_state(&self) -> serde_json::Value {
        json!(self.state)
    }
}
