pub mod games_service;

pub use games_service::{GamesService, RefreshOutcome, RefreshReport, ServiceConfig};
