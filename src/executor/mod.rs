pub mod driver;
pub mod input;
pub mod resolver;
pub mod targets;
