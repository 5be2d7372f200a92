pub mod etherscan;
pub mod verify;
pub use etherscan::*;
pub use verify::*;
