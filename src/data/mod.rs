//! Game data: canonical models and the normalization pipeline.

pub mod clock;
pub mod models;
pub mod parser;
pub mod status;
pub mod synthetic;
pub mod team;
pub mod time_estimator;
