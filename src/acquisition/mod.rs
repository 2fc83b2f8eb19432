pub mod acquirer;
pub mod strategy;
