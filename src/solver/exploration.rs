use rand::Rng;

/// Index of a maximal entry, chosen uniformly among all entries attaining
/// the maximum.
pub fn greedy_action<R: Rng + ?Sized>(values: &[f64], rng: &mut R) -> usize {
    if values.is_empty() {
        return 0;
    }

    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ties = values.iter().filter(|&&v| v == max).count();
    if ties == 0 {
        // only NaNs, nothing to prefer
        return rng.gen_range(0..values.len());
    }

    let pick = rng.gen_range(0..ties);
    values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v == max)
        .nth(pick)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Epsilon-greedy action selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// With probability `epsilon` a uniformly random action, otherwise
    /// [`greedy_action`].
    pub fn select<R: Rng + ?Sized>(&self, values: &[f64], rng: &mut R) -> usize {
        if !values.is_empty() && rng.gen_range(0.0..1.0) < self.epsilon {
            rng.gen_range(0..values.len())
        } else {
            greedy_action(values, rng)
        }
    }
}
