//! Shared utilities for Hiroba.
//!
//! Logger initialization and time helpers used by the server binary and tests.

pub mod logger;
pub mod time;
