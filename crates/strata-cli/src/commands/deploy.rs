//! Deploy export and import commands
//!
//! Usage: strata deploy export <DIR> | import <DIR> [--replace]

use std::path::PathBuf;

use clap::{Args, Subcommand};
use strata_core::logging_facility;
use strata_engine::config::DEFAULT_CONFIG_PATH;
use strata_engine::{run_deploy_persistent, DeployCommand, DeployConfig, DeployReport};
use strata_store::db::{open_and_migrate, DEFAULT_DB_PATH};

#[derive(Debug, Args)]
pub struct DeployArgs {
    #[command(subcommand)]
    pub command: DeployAction,
}

#[derive(Debug, Subcommand)]
pub enum DeployAction {
    /// Write the deployable state into a directory
    Export(ExportArgs),
    /// Reconcile the store with an exported directory
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Target directory; created if missing
    pub dir: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Directory written by `deploy export`
    pub dir: PathBuf,

    /// Delete top-level entities that are absent from the export
    #[arg(long)]
    pub replace: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct CommonArgs {
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Worker threads for page rendering and parsing
    #[arg(long)]
    pub workers: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute a deploy command, returning the process exit code
pub fn execute(args: DeployArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (cmd, common) = match args.command {
        DeployAction::Export(a) => (DeployCommand::Export { dir: a.dir }, a.common),
        DeployAction::Import(a) => (
            DeployCommand::Import {
                dir: a.dir,
                replace: a.replace,
            },
            a.common,
        ),
    };

    let mut config = DeployConfig::load_or_default(&common.config)?;
    if common.workers.is_some() {
        config.workers = common.workers;
    }
    logging_facility::init(config.logging);

    let mut conn = open_and_migrate(&common.db)?;
    let report = run_deploy_persistent(&cmd, &mut conn, &config)?;
    print_report(&report, common.json)?;

    Ok(report.outcome().exit_code())
}

fn print_report(report: &DeployReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let mut value = serde_json::to_value(report)?;
        value["outcome"] = serde_json::to_value(report.outcome())?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", report.summary());
    }
    Ok(())
}
