use clap::{Parser, Subcommand};
use mediashelf_common::MediaType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediashelf")]
#[command(author, version, about = "Personal media server with a video library scanner")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the background scan processor
    Start,

    /// Scan an index once and print the summary
    Scan {
        /// Index name or id
        index: String,
    },

    /// Create a new index
    AddIndex {
        /// Index name
        name: String,

        /// Index type (videos, photos, audio)
        #[arg(long, default_value = "videos")]
        media_type: MediaType,

        /// Root folders to scan
        #[arg(required = true)]
        folders: Vec<PathBuf>,
    },

    /// List configured indexes
    ListIndexes,

    /// Show the scan status of an index
    Status {
        /// Index name or id
        index: String,
    },

    /// Display version information
    Version,
}
