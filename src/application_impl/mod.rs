mod auth_classifier;
mod gateway_impl;
mod gateway_passthrough;
mod refresh_coordinator;

pub use auth_classifier::*;
pub use gateway_impl::*;
pub use gateway_passthrough::*;
pub use refresh_coordinator::*;
