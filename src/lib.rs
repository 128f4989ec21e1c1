//! Tejer — declarative resource-graph synthesis.
//!
//! Declared nodes form a dependency graph; synthesis resolves references,
//! external lookups, and deferred outputs into a deterministic,
//! BLAKE3-fingerprinted plan for an external provisioning engine.

pub mod cli;
pub mod core;
pub mod lookup;
pub mod trace;
