pub mod common;
pub mod generation;
pub mod trigger;

pub use common::*;
pub use generation::*;
pub use trigger::*;
