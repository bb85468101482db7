//! emolabel - client for the speech emotion annotation service
//!
//! Headless state machines for the annotation workspace, the qualification
//! and consistency tests and the admin dashboard, plus the `emolabel`
//! terminal front end built on top of them.

pub mod admin;
pub mod annotate;
pub mod api;
pub mod cli;
pub mod core;
pub mod output;
pub mod quiz;
pub mod session;

pub use core::config::Config;
pub use core::error::{Error, Result};
