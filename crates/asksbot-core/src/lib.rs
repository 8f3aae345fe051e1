//! Core domain + application logic for asksbot.
//!
//! This crate is intentionally framework-agnostic. Slack, the signal-tracking
//! HTTP API and the command server live behind ports (traits) implemented in
//! adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod extractor;
pub mod inbound;
pub mod logging;
pub mod messaging;
pub mod reconcile;
pub mod signal;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
