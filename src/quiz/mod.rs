//! Qualification and consistency tests

pub mod consistency;
pub mod qualification;

pub use consistency::{ConsistencyOutcome, ConsistencyTest, Start};
pub use qualification::{Answer, QualificationTest, TestOutcome, Widget};
