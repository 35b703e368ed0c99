use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "papershelf", about = "Literature catalog manager", version)]
pub struct Cli {
    /// Data directory holding the record store and fallback file.
    #[arg(long, default_value = "papershelf-data", global = true)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest paper records from JSON or CSV files.
    Add {
        /// Files to ingest (.json or .csv).
        files: Vec<PathBuf>,
    },

    /// List papers with optional filters.
    List {
        /// Free-text query over title, authors, abstract, and keywords.
        #[arg(long)]
        query: Option<String>,
        /// Research-area filter.
        #[arg(long)]
        category: Option<String>,
        /// Venue filter.
        #[arg(long)]
        venue: Option<String>,
        /// Inclusive year range lower bound.
        #[arg(long)]
        year_min: Option<i32>,
        /// Inclusive year range upper bound.
        #[arg(long)]
        year_max: Option<i32>,
        /// Sort order: year-desc, year-asc, citations-desc, citations-asc, title.
        #[arg(long, default_value = "year-desc")]
        sort: String,
        /// Page number (12 papers per page).
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Remove a paper by id.
    Delete { id: String },

    /// Write the static bundle to a directory.
    Export {
        /// Output directory.
        #[arg(long, default_value = "dist")]
        out: PathBuf,
        /// Hosted-release owner; with --repo, PDFs are queued as release
        /// assets instead of being inlined.
        #[arg(long, requires = "repo")]
        owner: Option<String>,
        /// Hosted-release repository name.
        #[arg(long, requires = "owner")]
        repo: Option<String>,
        /// Release tag; omitted means pending until deploy.
        #[arg(long)]
        tag: Option<String>,
    },

    /// Export, create the hosted release, and upload PDF assets.
    Deploy {
        #[arg(long, default_value = "dist")]
        out: PathBuf,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        #[arg(long)]
        tag: Option<String>,
        /// Credential token; falls back to $PAPERSHELF_TOKEN.
        #[arg(long)]
        token: Option<String>,
    },

    /// Configure the git remote for an account, push the current branch,
    /// and print the manual static-hosting steps.
    Publish {
        /// Target account name.
        account: String,
        /// Repository name on the account.
        #[arg(long, default_value = "papershelf")]
        repo: String,
    },

    /// Show where the catalog loaded from and fallback-store usage.
    Status,
}
