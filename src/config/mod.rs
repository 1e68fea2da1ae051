//! Configuration: operational constants and the runtime `Config` struct.

pub mod constants;
mod types;

pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};
