//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Search Anna's Archive and download books through the fast download API.
#[derive(Parser, Debug)]
#[command(name = "annas")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress everything but errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Search for books
    Search {
        /// Search terms, joined with spaces
        #[arg(required = true)]
        query: Vec<String>,

        /// Print results (and errors) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a book by its MD5 hash
    Download {
        /// Content hash of the record
        hash: String,

        /// Title used for the file name
        #[arg(long)]
        title: String,

        /// File extension, e.g. pdf or epub
        #[arg(long)]
        format: String,

        /// Destination directory (defaults to ANNAS_DOWNLOAD_PATH)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    /// Whether errors should be reported as JSON
    pub fn json_output(&self) -> bool {
        matches!(self.command, Command::Search { json: true, .. })
    }
}
