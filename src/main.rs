use devloop::cli::commands::{CliArgs, Commands};
use devloop::cli::handlers::{handle_build, handle_dev};
use devloop::util::logging::{init_logging, parse_level, LoggingConfig};
use devloop::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("devloop v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Build(build_args) => handle_build(build_args).await,
        Commands::Dev(dev_args) => handle_dev(dev_args).await,
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
