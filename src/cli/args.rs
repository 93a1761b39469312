//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reverse-engineer source trees into architecture diagrams
#[derive(Parser, Debug)]
#[command(name = "archscribe")]
#[command(about = "Reverse-engineer Python, PHP and JS/TS sources into Mermaid diagrams")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a source tree and write the model and diagrams
    Analyze {
        /// Root of the source tree
        path: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory name to skip at any depth (can be repeated)
        #[arg(long = "exclude-dir")]
        exclude_dirs: Vec<String>,

        /// Basename glob to skip (can be repeated)
        #[arg(long = "exclude-file")]
        exclude_files: Vec<String>,

        /// JSON file mapping flow names to interaction traces
        #[arg(long)]
        flows: Option<PathBuf>,

        /// Class count above which class diagrams are partitioned
        #[arg(long)]
        max_classes: Option<usize>,

        /// Methods shown per class
        #[arg(long)]
        max_methods: Option<usize>,

        /// Draw private members
        #[arg(long)]
        include_private: bool,

        /// Keep standard-library modules in module diagrams
        #[arg(long)]
        include_external: bool,

        /// Skip diagram generation
        #[arg(long)]
        no_diagrams: bool,

        #[arg(long)]
        no_python: bool,

        #[arg(long)]
        no_php: bool,

        #[arg(long)]
        no_javascript: bool,

        /// Print the model as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show version information
    Version,
}

impl Command {
    pub fn verbose(&self) -> bool {
        matches!(self, Command::Analyze { verbose: true, .. })
    }
}
