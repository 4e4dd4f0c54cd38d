//! Global tracing setup. Installing a subscriber is process-wide, so this is
//! exercised through the binary rather than unit tests.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
