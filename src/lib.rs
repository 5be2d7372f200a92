pub mod artifacts;
pub mod chain;
pub mod config;
pub mod errors;
pub mod explorer;
pub mod gas_reporter;
pub mod scripts;
pub mod tasks;
