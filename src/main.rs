use clap::Parser;
use launch_reporter::cli::commands::{cmd_replay, cmd_validate};
use launch_reporter::cli::config::{Cli, Commands, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());

    // Resolve server settings: CLI > config > defaults
    if let Some(endpoint) = &cli.endpoint {
        config.server.endpoint = endpoint.clone();
    }
    if let Some(project) = &cli.project {
        config.server.project = project.clone();
    }
    if let Some(token) = &cli.token {
        config.server.api_token = Some(token.clone());
    }

    match cli.command {
        Commands::Replay {
            events,
            dry_run,
            launch_name,
        } => {
            let healthy = cmd_replay(
                &events,
                dry_run,
                launch_name.as_deref(),
                &config,
                cli.verbose,
            )?;
            if !healthy {
                std::process::exit(1);
            }
        }
        Commands::Validate { events } => {
            let clean = cmd_validate(&events)?;
            if !clean {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
