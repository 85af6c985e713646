//! Subcommand implementations.

pub mod compare;
pub mod fingerprint;
pub mod hash;
pub mod search;
pub mod stats;
