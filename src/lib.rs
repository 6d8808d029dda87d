pub mod config;
pub mod env;
pub mod runtime;
pub mod session;
pub mod solver;
pub mod telemetry;
pub mod transport;
pub mod update;

pub use config::{ConfigError, EnvironmentOptions, ServiceConfig, TrainingConfig};
pub use env::{Env, EnvironmentKind};
pub use session::{SessionError, SessionRegistry, SessionState, SessionStatus};
pub use solver::{AlgorithmKind, AnySolver, Solver, create_solver};
pub use update::UpdateRecord;
