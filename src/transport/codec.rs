//! JSON framing of stream messages.

use serde_json::json;

use super::errors::TransportError;
use super::types::StreamMessage;

/// Close reasons are limited to 123 bytes by the WebSocket protocol.
pub const MAX_CLOSE_REASON: usize = 123;

/// Transport-neutral frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

pub fn encode(message: &StreamMessage) -> Result<Frame, TransportError> {
    match message {
        StreamMessage::Update(record) => Ok(Frame::Text(serde_json::to_string(record)?)),
        StreamMessage::Completed => Ok(Frame::Text(json!({ "status": "completed" }).to_string())),
        StreamMessage::Abort { code, reason } => Ok(Frame::Close {
            code: *code,
            reason: truncate_reason(reason).to_string(),
        }),
    }
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}
