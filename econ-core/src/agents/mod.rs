pub mod agent;
pub mod credit;

pub use agent::*;
pub use credit::*;
