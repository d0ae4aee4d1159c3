use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fll-migrate")]
#[command(version, about = "Build, upgrade, dump and merge FLL tournament databases")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new database from a challenge description
    Create {
        /// Challenge description XML
        challenge: PathBuf,

        /// Output SQLite database path
        output_db: PathBuf,

        /// Replace the output database if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Upgrade a database to the current schema version
    Upgrade {
        /// SQLite database to upgrade in place
        database: PathBuf,
    },

    /// Build a new database from a dump archive
    Load {
        /// Dump archive (zip)
        dump: PathBuf,

        /// Output SQLite database path
        output_db: PathBuf,

        /// Replace the output database if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Write a database out as a dump archive
    Dump {
        /// SQLite database to dump
        database: PathBuf,

        /// Output dump archive path
        output: PathBuf,
    },

    /// Import tournaments from a dump archive into an existing database
    Import {
        /// Dump archive holding the source tournaments
        dump: PathBuf,

        /// Destination SQLite database
        database: PathBuf,

        /// Only import this tournament (default: all)
        #[arg(short, long)]
        tournament: Option<String>,

        /// Skip performance scores and playoff data
        #[arg(long)]
        skip_performance: bool,

        /// Skip subjective scores and awards
        #[arg(long)]
        skip_subjective: bool,

        /// Skip the finalist schedule
        #[arg(long)]
        skip_finalist: bool,

        /// Skip the awards script
        #[arg(long)]
        skip_awards_script: bool,

        /// Import even when team differences are found
        #[arg(short, long)]
        force: bool,
    },

    /// Report team and awards script differences between a dump and a database
    Check {
        /// Dump archive holding the source tournament
        dump: PathBuf,

        /// Destination SQLite database
        database: PathBuf,

        /// Tournament to compare
        tournament: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the schema version of a database
    Version {
        /// SQLite database
        database: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
