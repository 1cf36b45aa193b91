//! # kudos
//!
//! Operational CLI over `kudos-core`. Exposed as a library so the command
//! layer can be driven from tests.

pub mod cli;
pub mod config;
