//! Library entrypoint for courtside.
//!
//! Exposes all modules so the binary and integration tests can import them.

pub mod acquisition;
pub mod analysis;
pub mod api;
pub mod config;
pub mod data;
pub mod service;
pub mod state;
