pub mod aggregator;
pub mod collector;
