use crackbox::cli::commands::{CliArgs, Commands};
use crackbox::cli::handlers::{handle_extract, handle_health, handle_qr, ExtractVariant};
use crackbox::util::logging::{init_logging, parse_level, LoggingConfig};
use crackbox::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("crackbox v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Extract(extract_args) => handle_extract(extract_args, ExtractVariant::Extract).await,
        Commands::Zip(extract_args) => handle_extract(extract_args, ExtractVariant::Zip).await,
        Commands::Qr(qr_args) => handle_qr(qr_args).await,
        Commands::Health(health_args) => handle_health(health_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();
    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }
    init_logging(config);
}
