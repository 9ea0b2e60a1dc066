//! regen CLI entry point

use anyhow::Result;
use clap::Parser;

use regen::cli::{Cli, Commands, ConfigCommands, ProgressCommands};
use regen::pipeline::RunOptions;
use regen::{logging, Config};

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command {
        Commands::Run {
            service,
            document_type,
            interactive,
            restart,
            force,
        } => {
            let config = Config::load_from(&config_path)?;
            let options = RunOptions {
                service_id: service,
                document_type,
                interactive,
                restart,
                force,
                ..RunOptions::default()
            };
            commands::run::handle(&config, options)
        }
        Commands::List => commands::list::handle(&Config::load_from(&config_path)?),
        Commands::Progress { command } => {
            let config = Config::load_from(&config_path)?;
            match command {
                ProgressCommands::Show => commands::progress::handle_show(&config),
                ProgressCommands::Reset => commands::progress::handle_reset(&config),
            }
        }
        Commands::Rules { command } => {
            commands::rules::handle(&Config::load_from(&config_path)?, command)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::handle_show(&config_path),
            ConfigCommands::Edit => commands::config::handle_edit(&config_path),
            ConfigCommands::Init { force } => commands::config::handle_init(&config_path, force),
        },
        Commands::Completions { shell } => commands::completions::handle(shell),
    }
}
