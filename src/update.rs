//! Progress records emitted by solvers and forwarded to subscribers.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// State values indexed by state. Serializes as a map keyed by the
/// stringified state index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSnapshot(pub Vec<f64>);

/// Greedy action per state. Serializes like [`ValueSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicySnapshot(pub Vec<usize>);

fn serialize_indexed<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    let mut map = serializer.serialize_map(Some(values.len()))?;
    for (state, value) in values.iter().enumerate() {
        map.serialize_entry(&state.to_string(), value)?;
    }
    map.end()
}

impl Serialize for ValueSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_indexed(&self.0, serializer)
    }
}

impl Serialize for PolicySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_indexed(&self.0, serializer)
    }
}

/// One progress event. `value_function` and `policy` are only present at
/// checkpoints and are omitted from the wire format otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    pub episode: usize,
    pub step: usize,
    pub reward: f64,
    pub cumulative_reward: f64,
    pub state: serde_json::Value,
    pub action: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_function: Option<ValueSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicySnapshot>,
}

impl UpdateRecord {
    pub fn has_snapshot(&self) -> bool {
        self.value_function.is_some() && self.policy.is_some()
    }

    pub fn with_snapshot(mut self, snapshot: Option<(ValueSnapshot, PolicySnapshot)>) -> Self {
        if let Some((values, policy)) = snapshot {
            self.value_function = Some(values);
            self.policy = Some(policy);
        }
        self
    }
}

/// How often a solver attaches a full value/policy snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// At the terminal step of every `n`th episode, starting with the first.
    EveryNthEpisode(usize),
    /// Every `n`th iteration, starting with the first, plus the final one.
    EveryNthIteration(usize),
    EveryIteration,
}

impl Checkpoint {
    pub const LEARNER: Checkpoint = Checkpoint::EveryNthEpisode(50);
    pub const VALUE_ITERATION: Checkpoint = Checkpoint::EveryNthIteration(10);
    pub const POLICY_ITERATION: Checkpoint = Checkpoint::EveryIteration;

    /// `index` is zero-based; `is_final` marks the last episode step or the
    /// last planning iteration.
    pub fn is_due(&self, index: usize, is_final: bool) -> bool {
        match *self {
            Checkpoint::EveryNthEpisode(n) => is_final && index % n.max(1) == 0,
            Checkpoint::EveryNthIteration(n) => is_final || index % n.max(1) == 0,
            Checkpoint::EveryIteration => true,
        }
    }
}
