pub mod betting;
