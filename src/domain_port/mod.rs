mod notifier;
mod session_store;
mod transport;

pub use notifier::*;
pub use session_store::*;
pub use transport::*;
