pub mod history;
pub mod loop_control;
pub mod orchestrator;
pub mod state;
pub mod stats;
