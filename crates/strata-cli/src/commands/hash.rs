//! Canonical digest command
//!
//! Prints the digest of the whole deployable state, or of one page. Two
//! environments holding the same content print the same digest.

use std::path::PathBuf;

use clap::Args;
use strata_core::logging_facility::{self, Profile};
use strata_core::{canonical_digest, canonical_string, site_digest, site_fingerprint, EntityRef};
use strata_store::db::{open_and_migrate, DEFAULT_DB_PATH};
use strata_store::repo::load_store;

#[derive(Debug, Args)]
pub struct HashArgs {
    /// Digest only this page
    #[arg(long)]
    pub page: Option<String>,

    /// Print the canonical text instead of its digest
    #[arg(long)]
    pub canonical: bool,

    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
}

pub fn execute(args: HashArgs) -> Result<(), Box<dyn std::error::Error>> {
    logging_facility::init(Profile::Production);
    let conn = open_and_migrate(&args.db)?;
    let store = load_store(&conn)?;

    let output = match &args.page {
        Some(name) => {
            let page = store
                .page_by_name(name)
                .ok_or_else(|| format!("page '{}' not found", name))?;
            let root = EntityRef::page(&page.id);
            if args.canonical {
                canonical_string(&store, &root)?
            } else {
                canonical_digest(&store, &root)?
            }
        }
        None if args.canonical => site_fingerprint(&store),
        None => site_digest(&store),
    };

    if args.canonical {
        print!("{}", output);
    } else {
        println!("{}", output);
    }
    Ok(())
}
