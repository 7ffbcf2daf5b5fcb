pub mod global;
pub mod pricing;

pub use global::*;
pub use pricing::*;
