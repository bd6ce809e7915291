#[macro_use]
mod macros;

pub mod cost;
pub mod percent;
pub mod rate;
