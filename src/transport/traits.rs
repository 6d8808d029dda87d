use async_trait::async_trait;

use super::errors::TransportError;
use super::types::StreamMessage;

/// Receiver of a session's stream.
///
/// A failed delivery is final: the session stops training and does not
/// retry.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn deliver(&self, message: StreamMessage) -> Result<(), TransportError>;
}
