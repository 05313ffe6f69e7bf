pub mod classifier;
pub mod combine;
pub mod knowledge;
pub mod planner;
pub mod types;
