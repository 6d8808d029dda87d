mod channel;
pub mod codec;
mod errors;
mod traits;
mod types;
pub mod websocket;

pub use channel::ChannelSubscriber;
pub use errors::TransportError;
pub use traits::Subscriber;
pub use types::{ControlCommand, INTERNAL_ERROR, SESSION_NOT_FOUND, StreamMessage};
