pub mod display;
pub mod variation;

pub use display::*;
pub use variation::*;
