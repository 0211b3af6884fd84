mod cli;
mod commands;
mod detect;
mod installers;
mod libs;
mod logger;
mod schemas;
mod versions;

use clap::Parser;
use cli::cmd_enums::{Cli, Commands};
use colored::Colorize;

fn main() {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let result = match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Install(args) => commands::install::run(args),
        Commands::Cleanup { workspace } => commands::cleanup::run(workspace),
        Commands::Versions { platform } => commands::versions::run(platform),
    };

    if let Err(err) = result {
        log_error!("{err:#}");
        std::process::exit(1);
    }
}
