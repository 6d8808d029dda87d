use crate::update::UpdateRecord;

/// Close code sent when the session id of a stream is unknown.
pub const SESSION_NOT_FOUND: u16 = 4004;
/// Close code sent when training aborts with a fault.
pub const INTERNAL_ERROR: u16 = 1011;

/// What a session pushes to its subscriber, in production order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Update(UpdateRecord),
    /// The solver exhausted its budget.
    Completed,
    /// Training failed; the stream is closed with `code` and `reason`.
    Abort { code: u16, reason: String },
}

impl StreamMessage {
    pub fn abort(reason: impl Into<String>) -> Self {
        StreamMessage::Abort {
            code: INTERNAL_ERROR,
            reason: reason.into(),
        }
    }

    /// Whether nothing follows this message on the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamMessage::Update(_))
    }
}

/// Text commands accepted on an open stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
}

impl ControlCommand {
    /// Unrecognised text yields `None` and is ignored by callers.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "START" => Some(ControlCommand::Start),
            "STOP" => Some(ControlCommand::Stop),
            _ => None,
        }
    }
}
