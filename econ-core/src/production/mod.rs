pub mod business;
pub mod dominance;

pub use business::*;
pub use dominance::*;
