pub mod clearing;
pub mod reservation;

pub use clearing::*;
pub use reservation::*;
