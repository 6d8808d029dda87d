use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::binning::{bin_index, combine, linspace};
use super::errors::EnvError;
use super::traits::{Env, check_action};
use super::types::EnvState;

const GRAVITY: f64 = 9.8;
const CART_MASS: f64 = 1.0;
const POLE_MASS: f64 = 0.1;
const TOTAL_MASS: f64 = CART_MASS + POLE_MASS;
const HALF_POLE_LENGTH: f64 = 0.5;
const POLE_MASS_LENGTH: f64 = POLE_MASS * HALF_POLE_LENGTH;
const FORCE_MAG: f64 = 10.0;
const TAU: f64 = 0.02;
const X_THRESHOLD: f64 = 2.4;
const THETA_THRESHOLD: f64 = 12.0 * 2.0 * std::f64::consts::PI / 360.0;

// (low, high) of the discretisation grid per dimension:
// cart position, cart velocity, pole angle, pole angular velocity
const BIN_RANGES: [(f64, f64); 4] = [(-2.4, 2.4), (-3.0, 3.0), (-0.25, 0.25), (-3.0, 3.0)];

/// Cart-pole balancing with the continuous state binned into a single
/// discrete index. Physics has no closed-form transition table, so this
/// environment is not model-based.
#[derive(Debug, Clone)]
pub struct CartPole {
    n_bins: usize,
    edges: [Vec<f64>; 4],
    state: [f64; 4],
    steps: usize,
    max_steps: usize,
    rng: StdRng,
}

impl CartPole {
    pub const DEFAULT_BINS: usize = 10;
    pub const DEFAULT_MAX_STEPS: usize = 500;

    pub fn new(n_bins: usize, seed: u64) -> Self {
        let n_bins = n_bins.max(1);
        let edges = BIN_RANGES.map(|(low, high)| linspace(low, high, n_bins));
        Self {
            n_bins,
            edges,
            state: [0.0; 4],
            steps: 0,
            max_steps: Self::DEFAULT_MAX_STEPS,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of discrete states for `n_bins`, `None` when it overflows.
    pub fn state_count(n_bins: usize) -> Option<usize> {
        n_bins.max(1).checked_add(1)?.checked_pow(4)
    }

    pub fn continuous_state(&self) -> [f64; 4] {
        self.state
    }

    fn discretize(&self) -> usize {
        let bins = self
            .state
            .iter()
            .zip(&self.edges)
            .map(|(&value, edges)| bin_index(value, edges));
        combine(bins, self.n_bins.saturating_add(1))
    }

    fn info(&self) -> serde_json::Value {
        json!({
            "continuous_state": self.state,
            "cart_position": self.state[0],
            "pole_angle": self.state[2],
        })
    }
}

impl Env for CartPole {
    fn reset(&mut self) -> Result<EnvState, EnvError> {
        for value in self.state.iter_mut() {
            *value = self.rng.gen_range(-0.05..0.05);
        }
        self.steps = 0;
        Ok(EnvState::initial(self.discretize(), self.info()))
    }

    fn step(&mut self, action: usize) -> Result<EnvState, EnvError> {
        check_action(action, 2)?;
        self.steps += 1;

        let [x, x_dot, theta, theta_dot] = self.state;
        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };
        let (sin, cos) = theta.sin_cos();

        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (HALF_POLE_LENGTH * (4.0 / 3.0 - POLE_MASS * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];

        let terminated =
            self.state[0].abs() > X_THRESHOLD || self.state[2].abs() > THETA_THRESHOLD;

        Ok(EnvState {
            observation: self.discretize(),
            reward: 1.0,
            done: terminated || self.steps >= self.max_steps,
            info: self.info(),
        })
    }

    fn state_space_size(&self) -> usize {
        self.n_bins.saturating_add(1).saturating_pow(4)
    }

    fn action_space_size(&self) -> usize {
        2
    }

    fn render(&self) -> serde_json::Value {
        json!({
            "cart_position": self.state[0],
            "cart_velocity": self.state[1],
            "pole_angle": self.state[2],
            "pole_velocity": self.state[3],
        })
    }

    fn visual_state(&self) -> serde_json::Value {
        json!(self.state)
    }
}
