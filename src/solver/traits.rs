use super::errors::SolverError;
use crate::env::Env;
use crate::update::{PolicySnapshot, UpdateRecord, ValueSnapshot};

/// Incremental training contract shared by every solver.
///
/// The orchestrator calls [`Solver::next_update`] repeatedly; each call
/// performs one environment step (learners) or one planning iteration
/// (planners), finishes all table mutation, and returns the record
/// describing it. `Ok(None)` means the training budget is exhausted.
pub trait Solver: Send {
    fn next_update(&mut self, env: &mut dyn Env) -> Result<Option<UpdateRecord>, SolverError>;

    /// `V(s)`; for Q-form solvers this is `max_a Q(s, a)`.
    fn value_function(&self) -> ValueSnapshot;

    /// Greedy policy with uniform tie-break among maximal actions.
    fn policy(&mut self) -> PolicySnapshot;

    /// Greedy action for `state`, without exploration.
    fn select_action(&mut self, state: usize) -> usize;

    fn is_finished(&self) -> bool;
}
