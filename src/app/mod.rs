//! Application-level utilities: logger setup.

mod logging;

pub use logging::init_logger_with;
