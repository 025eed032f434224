//! Principal commands
//!
//! Usage: strata principal add <NAME> [--group] [--member-of GROUP]...
//!        strata principal list

use std::path::PathBuf;

use clap::{Args, Subcommand};
use strata_core::logging_facility::{self, Profile};
use strata_core::model::PrincipalKind;
use strata_core::ops::principal_ops;
use strata_core::{transact, StrataError};
use strata_store::db::{open_and_migrate, DEFAULT_DB_PATH};
use strata_store::repo::{load_store, SqliteRepo};

#[derive(Debug, Args)]
pub struct PrincipalArgs {
    #[command(subcommand)]
    pub command: PrincipalCommand,
}

#[derive(Debug, Subcommand)]
pub enum PrincipalCommand {
    /// Create a user or group; pending references to its name are bound
    Add(AddArgs),
    /// List principals and names still referenced but missing
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub name: String,

    /// Create a group instead of a user
    #[arg(long)]
    pub group: bool,

    /// Existing group to join; repeatable
    #[arg(long = "member-of")]
    pub member_of: Vec<String>,

    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
}

pub fn execute(args: PrincipalArgs) -> Result<(), Box<dyn std::error::Error>> {
    logging_facility::init(Profile::Production);
    match args.command {
        PrincipalCommand::Add(add_args) => execute_add(add_args),
        PrincipalCommand::List(list_args) => execute_list(list_args),
    }
}

fn execute_add(args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = open_and_migrate(&args.db)?;
    let mut store = load_store(&conn)?;
    let pending_before = principal_ops::pending_names(&store);

    let kind = if args.group {
        PrincipalKind::Group
    } else {
        PrincipalKind::User
    };
    let id = transact(&mut store, |s| {
        let id = principal_ops::create_principal(s, &args.name, kind)?;
        for group in &args.member_of {
            let group_id = s
                .principal_by_name(group)
                .map(|g| g.id.clone())
                .ok_or_else(|| StrataError::PrincipalNotFound {
                    principal: group.clone(),
                })?;
            principal_ops::add_member(s, &id, &group_id)?;
        }
        Ok::<_, StrataError>(id)
    })?;
    SqliteRepo::save_store(&mut conn, &store)?;

    let bound = pending_before.contains(&args.name);
    println!(
        "Added {} {} ({})",
        if args.group { "group" } else { "user" },
        args.name,
        id
    );
    if bound {
        println!("  bound pending references to {}", args.name);
    }
    Ok(())
}

fn execute_list(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_and_migrate(&args.db)?;
    let store = load_store(&conn)?;

    let mut principals = store.list_principals();
    principals.sort_by(|a, b| a.name.cmp(&b.name));
    for p in principals {
        let kind = if p.is_group() { "group" } else { "user" };
        let groups: Vec<&str> = p
            .member_of
            .iter()
            .filter_map(|g| store.get_principal(g).ok())
            .map(|g| g.name.as_str())
            .collect();
        if groups.is_empty() {
            println!("{:<6} {}", kind, p.name);
        } else {
            println!("{:<6} {} (member of {})", kind, p.name, groups.join(", "));
        }
    }
    for name in principal_ops::pending_names(&store) {
        println!("pending {}", name);
    }
    Ok(())
}
