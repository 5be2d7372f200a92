pub mod common;
pub mod factory;
pub mod membership;
pub use common::*;
