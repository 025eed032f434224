//! Strata CLI
//!
//! Command-line interface for Strata deployments

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "strata")]
#[command(about = "Strata - content deployment synchronization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Export to or import from a deployment directory
    Deploy(commands::deploy::DeployArgs),
    /// Print canonical digests of the stored content
    Hash(commands::hash::HashArgs),
    /// Principal operations
    Principal(commands::principal::PrincipalArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::execute(args),
        Commands::Hash(args) => commands::hash::execute(args).map(|()| 0),
        Commands::Principal(args) => commands::principal::execute(args).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
