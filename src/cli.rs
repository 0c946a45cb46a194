use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mergeforged")]
#[command(author, version, about = "Merge video files with lossless concatenation when possible")]
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
    /// Merge video files into one, optionally adding subtitle and audio tracks
    Merge {
        /// Files to merge, in order; audio and subtitle files are added as tracks
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file name (extension is replaced by the target container's)
        #[arg(short, long)]
        output: Option<String>,

        /// Subtitle file to add to the merged video
        #[arg(long = "subtitle")]
        subtitles: Vec<PathBuf>,

        /// Audio file to add to the merged video as an extra track
        #[arg(long)]
        audio: Vec<PathBuf>,

        /// Directory the output is written to
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },

    /// Probe a media file and display its stream profile
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether files can be merged without re-encoding
    Analyze {
        /// Files to analyze, in merge order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
