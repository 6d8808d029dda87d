mod errors;
mod registry;
#[allow(clippy::module_inception)]
mod session;
mod shared;
mod training_loop;
mod types;

pub use errors::SessionError;
pub use registry::SessionRegistry;
pub use session::Session;
pub use types::{SessionState, SessionStatus, SubscriberId};
