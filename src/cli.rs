//! Command-line interface definitions.
//!
//! Kept in the library so `xtask` can render man pages from the same
//! definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[cfg(not(feature = "release"))]
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    " ",
    env!("REGEN_BUILD_DATE"),
    ")"
);

#[cfg(feature = "release")]
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("REGEN_BUILD_DATE"), ")");

/// `--version` output, naming the repository the binary was built from.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nbuild date: ",
    env!("REGEN_BUILD_DATE"),
    "\nrepository: ",
    env!("REGEN_REPO_NAME")
);

#[derive(Debug, Parser)]
#[command(name = "regen", version = VERSION, long_version = LONG_VERSION, about, long_about = None)]
pub struct Cli {
    /// Configuration file [default: <config dir>/regen/config.toml, or $REGEN_CONFIG]
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Regenerate versions from snapshots
    #[command(long_about = "Replay snapshots in fetch order and record a version each time \
the extracted text changes.\n\n\
A run resumes after the stored checkpoint. Without a checkpoint (or with --restart) \
the version store is emptied first.")]
    Run {
        /// Only snapshots of this service
        #[arg(short, long, default_value = "*")]
        service: String,

        /// Only snapshots of this document type
        #[arg(short = 'd', long = "document-type", default_value = "*")]
        document_type: String,

        /// Ask before recording each version or giving up on a snapshot
        #[arg(short, long)]
        interactive: bool,

        /// Ignore the checkpoint and start over
        #[arg(long)]
        restart: bool,

        /// Review a document already marked as done
        #[arg(long)]
        force: bool,
    },

    /// List declared documents and whether they are done
    List,

    /// Inspect or reset the run checkpoint
    Progress {
        #[command(subcommand)]
        command: ProgressCommands,
    },

    /// Edit skip rules and document type aliases
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },

    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProgressCommands {
    /// Print the stored checkpoint
    Show,
    /// Delete the stored checkpoint
    Reset,
}

#[derive(Debug, Subcommand)]
pub enum RulesCommands {
    /// Print the rules file
    Show,
    /// Skip snapshots where SELECTOR matches
    SkipSelector {
        /// Service id, or * for every service
        service: String,
        /// Document type, or * for every type
        document_type: String,
        selector: String,
    },
    /// Skip snapshots where SELECTOR does not match
    SkipMissingSelector {
        service: String,
        document_type: String,
        selector: String,
    },
    /// Skip snapshots where SELECTOR's inner HTML equals VALUE
    SkipContent {
        service: String,
        document_type: String,
        selector: String,
        value: String,
    },
    /// Mark a snapshot as unprocessable
    SkipCommit {
        service: String,
        document_type: String,
        snapshot_id: String,
    },
    /// Mark a document as reviewed
    Done {
        service: String,
        document_type: String,
    },
    /// Treat document type RAW as CANONICAL
    Alias { raw: String, canonical: String },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Open the configuration file in $EDITOR
    Edit,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
