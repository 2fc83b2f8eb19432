//! Upstream network access.

pub mod client;
pub mod errors;
