mod memory_session_store;
mod notifier_fake;
mod transport_fake;

pub use memory_session_store::*;
pub use notifier_fake::*;
pub use transport_fake::*;
