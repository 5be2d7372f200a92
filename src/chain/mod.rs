pub mod contracts;
pub mod deployer;
pub mod provider;
pub use deployer::*;
pub use provider::*;
