//! Core foundation: value types and math primitives.

pub mod math;
pub mod types;
