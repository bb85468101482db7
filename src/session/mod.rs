//! Annotator session: login, routing and the local session file

pub mod store;
pub mod user;

pub use store::{SessionData, UsernameStore};
pub use user::{route_for, validate_login, Page, UserManager};
