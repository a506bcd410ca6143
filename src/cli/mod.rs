pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ExtractArgs, HealthArgs, QrArgs};
pub use handlers::ExtractVariant;
pub use output::{OutputFormat, OutputFormatter};
