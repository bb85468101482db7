//! Configuration, errors and shared plumbing

pub mod config;
pub mod context;
pub mod error;
pub mod prompt;
pub mod request;
