//! Score sync backend library
//!
//! A gateway service onto a rate-limited external scores API: concurrent
//! callers share one token bucket, and long-running batch sync jobs can be
//! cancelled out-of-band with partial progress preserved. The binary is in
//! `src/main.rs`; modules are exposed here for integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod jobs;
pub mod limiter;
pub mod store;
