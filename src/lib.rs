//! prism-review library crate
//!
//! Exposes the diff parsing and analysis pipeline so tests and external
//! tooling can exercise it without going through CLI startup.

pub mod analysis;
pub mod config;
pub mod diff;
pub mod git_ops;
pub mod platform;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod util;
