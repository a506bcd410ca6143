//! Utility modules for crackbox

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
