use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::extractors::FetchProfile;

#[derive(Parser)]
#[command(
    name = "fetchscribe",
    about = "Fetchscribe - Download YouTube media with subtitles and transcribe audio with Sarvam AI",
    version,
    long_about = "A CLI tool with two independent pipelines: `fetch` downloads audio or video plus subtitles and metadata through yt-dlp and copies verified results to an output directory, `transcribe` runs a Sarvam AI batch speech-to-text job over local audio files and downloads its outputs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download media, subtitles and metadata for one or more videos
    Fetch {
        /// Content identifiers or YouTube URLs
        #[arg(value_name = "ID_OR_URL", default_value = "5TBgsf5chxQ")]
        ids: Vec<String>,

        /// Directory that receives one subdirectory per identifier
        #[arg(short, long, value_name = "DIR", default_value = "audio_input")]
        output: PathBuf,

        /// Which stream variant to fetch
        #[arg(short, long, value_enum, default_value = "audio")]
        mode: FetchProfile,
    },

    /// Transcribe local audio files with a batch speech-to-text job
    Transcribe {
        /// Audio files to upload
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Language code (defaults to the configured one, e.g. hi-IN)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Model identifier (defaults to the configured one, e.g. saarika:v2.5)
        #[arg(long, value_name = "MODEL")]
        model: Option<String>,

        /// Directory for downloaded outputs (defaults to ./out)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// API subscription key
        #[arg(long, env = "SARVAM_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
