//! Synthesis provenance — JSONL event log and BLAKE3 fingerprinting.

pub mod eventlog;
pub mod hasher;
