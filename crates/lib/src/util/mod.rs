//! Shared utilities.
//!
//! Hashing primitives, module syntax patterns, and small text helpers used
//! across the pipeline.

pub mod hash;
pub mod syntax;
pub mod text;
