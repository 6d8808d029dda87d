use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::config::TrainingConfig;

/// Lifecycle of a session.
///
/// `Created` and `Stopped` may be started; `Completed` and `Errored` are
/// final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Running,
    Stopped,
    Completed,
    Errored,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
            SessionState::Completed => "completed",
            SessionState::Errored => "errored",
        }
    }

    pub fn is_resumable(&self) -> bool {
        matches!(self, SessionState::Created | SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub state: SessionState,
    pub is_running: bool,
    pub current_episode: usize,
    pub total_episodes: usize,
    /// Seconds spent running so far.
    pub elapsed_time: f64,
    pub config: TrainingConfig,
    /// Why the session is `Errored`, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Identifies one attachment of a subscriber to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub(crate) u64);
