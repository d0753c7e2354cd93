//! CLI argument parsing using clap v4
//!
//! Defines the operator command-line interface for fellowship agents.

use clap::{Parser, Subcommand};

/// Fellowship Agent - persona agents on Dapr
///
/// Runs a persona (Gimli the dwarf, Aragorn the ranger) as an assistant
/// agent wired to a Dapr sidecar and a hosted language model.
#[derive(Parser, Debug)]
#[command(name = "fellowship-agent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a persona agent until interrupted
    Run {
        /// Persona to run (dwarf, ranger)
        #[arg(short, long, env = "FELLOWSHIP_PERSONA")]
        persona: String,

        /// Path to configuration file
        #[arg(short, long, env = "FELLOWSHIP_CONFIG")]
        config: Option<String>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Inspect the bundled personas
    Persona {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },
}

/// Persona subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List the bundled personas
    List,

    /// Show a persona and the system prompt it produces
    Show {
        /// Persona: dwarf, ranger (or gimli, aragorn)
        persona: String,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
