use async_trait::async_trait;
use tokio::sync::mpsc;

use super::errors::TransportError;
use super::traits::Subscriber;
use super::types::StreamMessage;

/// Subscriber backed by a bounded channel. Delivery waits for room, so a
/// slow reader slows the session down instead of dropping records.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    sender: mpsc::Sender<StreamMessage>,
}

impl ChannelSubscriber {
    pub fn new(sender: mpsc::Sender<StreamMessage>) -> Self {
        Self { sender }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn deliver(&self, message: StreamMessage) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }
}
