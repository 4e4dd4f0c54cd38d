pub mod api;
pub mod logger;
pub mod settings;

pub mod application_impl;
pub mod application_port;
pub mod domain_model;
pub mod domain_port;
pub mod infra_fs;
pub mod infra_memory;
pub mod infra_reqwest;
pub mod infra_tracing;
