//! Recording sidecar for RICE Tester.
//!
//! Drives a Chromium browser over CDP, turns the user's interactions into an
//! ordered list of test steps and saves them as named step groups in SQLite.

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod models;
pub mod recording;
pub mod store;
