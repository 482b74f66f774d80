//! Pass scheduling, result store, and cross-unit lookup

pub mod bridge;
pub mod scheduler;
pub mod verify;

pub use scheduler::{Compiler, Granularity, Pass, PassKind, PassOutput, PassResults, Project};
