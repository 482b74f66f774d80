//! Resolver engine - forward-declaration resolution per compilation unit

pub mod engine;

pub use engine::{resolve_unit, DefinedTypes, TypeResolutionPass, UnitResolver};
