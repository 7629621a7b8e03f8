use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the erasure binary.
#[derive(Parser, Debug)]
#[command(
    name = "erasure",
    version,
    about = "Inspect and erase entity types in bonsai expression documents"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List the entity types and mapped enums an expression depends on.
    Analyze {
        /// Bonsai JSON document.
        file: PathBuf,
    },
    /// Replace every entity type with a structural type and print the result.
    Rewrite {
        /// Bonsai JSON document.
        file: PathBuf,

        /// Substitutor options as inline JSON, e.g. `{"defaultPolicy":"reference"}`.
        #[arg(long)]
        options: Option<String>,

        /// Print the rewritten document on a single line.
        #[arg(long)]
        compact: bool,
    },
}
