pub mod pace;
pub mod position_fix;
pub mod tracker;
pub mod util;
