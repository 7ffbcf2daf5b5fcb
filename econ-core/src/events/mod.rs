//! Event System
//!
//! Shock templates, the pending/active/scheduled state machine, and the
//! effects active events have on the world.

pub mod catalog;
pub mod effects;
pub mod system;

pub use catalog::*;
pub use effects::*;
pub use system::*;
