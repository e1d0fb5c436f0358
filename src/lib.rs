//! Fetchscribe - YouTube media fetching and batch speech-to-text in one CLI
//!
//! This library provides two independent pipelines: one drives `yt-dlp` to fetch
//! audio/video plus subtitles into a staging directory and copies verified results
//! out, the other drives a remote Sarvam AI batch transcription job to completion.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod fetch;
pub mod staging;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{ExtractionEngine, FetchProfile};
pub use fetch::FetchPipeline;
pub use transcribe::{TranscriptionOutcome, TranscriptionPipeline};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to fetchscribe
#[derive(thiserror::Error, Debug)]
pub enum FetchscribeError {
    #[error("Invalid content identifier: {0}")]
    InvalidContentId(String),

    #[error("Media extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Could not download the media file for {0}. Maybe only metadata is present.")]
    MediaMissing(String),

    #[error("Transcription job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
