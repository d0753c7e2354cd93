//! Fellowship Agent - operator CLI
//!
//! Runs any bundled persona and inspects personas and configuration.
//! The `dwarf` and `ranger` binaries are the argument-less equivalents of
//! `fellowship-agent run --persona <name>`.

mod cli;

use clap::Parser;

use fellowship_agent::bootstrap::{self, report_failure};
use fellowship_agent::config::{self, AgentConfig};
use fellowship_agent::error::{Error, Result};
use fellowship_agent::persona::{PersonaKind, PersonaRegistry};
use fellowship_agent::{dotenv, logging, version};

use crate::cli::{Cli, Commands, ConfigSubcommand, PersonaSubcommand};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(())
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            dotenv::load_dotenv();
            handle_config_command(subcommand)
        }
        Commands::Persona { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            handle_persona_command(subcommand)
        }
        Commands::Run { persona, config } => {
            // Startup failures are reported on stdout and never change the exit status
            match persona.parse::<PersonaKind>() {
                Ok(kind) => {
                    bootstrap::launch(kind, config.as_deref(), cli.verbose, cli.quiet);
                }
                Err(_) => {
                    report_failure(&mut std::io::stdout(), &Error::PersonaNotFound { name: persona });
                }
            }
            Ok(())
        }
    }
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = AgentConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => match AgentConfig::load(config.as_deref()) {
            Ok(_) => {
                println!("Configuration is valid.");
            }
            Err(e) => {
                eprint!("{}", e.format_for_terminal());
                std::process::exit(e.exit_code());
            }
        },
    }

    Ok(())
}

/// Handle persona subcommands
fn handle_persona_command(subcommand: PersonaSubcommand) -> Result<()> {
    let registry = PersonaRegistry::new();

    match subcommand {
        PersonaSubcommand::List => {
            println!("Bundled personas:");
            for listing in registry.list_available() {
                match listing.persona {
                    Ok(p) => println!("  {:<8} {} ({})", listing.kind.slug(), p.name, p.role),
                    Err(e) => println!("  {:<8} invalid: {}", listing.kind.slug(), e),
                }
            }
        }
        PersonaSubcommand::Show { persona } => {
            let p = registry.load_by_name(&persona)?;
            println!("Name:  {}", p.name);
            println!("Role:  {}", p.role);
            println!("Goal:  {}", p.goal);
            println!("Topic: {}", p.name);
            println!();
            println!("Instructions:");
            for (i, instruction) in p.instructions.iter().enumerate() {
                println!("  {}. {}", i + 1, instruction);
            }
            println!();
            println!("System prompt:");
            let date = chrono::Local::now().format("%B %d, %Y").to_string();
            println!("{}", p.system_prompt(&date));
        }
    }

    Ok(())
}
