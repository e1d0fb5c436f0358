use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::utils::check_file_accessible;
use crate::Result;

pub mod processor;
pub mod sarvam;

/// Parameters a batch job is created with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    pub language_code: String,
    pub model: String,
}

/// Server-side lifecycle state of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Accepted,
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// No further remote progress happens from a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Accepted => "Accepted",
            JobState::Pending => "Pending",
            JobState::Running => "Running",
            JobState::Completed => "Completed",
            JobState::Failed => "Failed",
            JobState::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file reference inside a job detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    pub file_name: String,
    #[serde(default)]
    pub file_id: Option<String>,
}

/// Per-input progress reported by the service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(default)]
    pub inputs: Vec<JobFile>,
    #[serde(default)]
    pub outputs: Vec<JobFile>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Snapshot of a job as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub job_state: JobState,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub job_details: Vec<JobDetail>,
}

impl JobStatus {
    pub fn is_failed(&self) -> bool {
        self.job_state == JobState::Failed
    }

    pub fn is_successful(&self) -> bool {
        self.job_state == JobState::Completed
    }

    /// Output file names listed across all job details
    pub fn output_file_names(&self) -> Vec<String> {
        self.job_details
            .iter()
            .flat_map(|detail| detail.outputs.iter().map(|f| f.file_name.clone()))
            .collect()
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionOutcome {
    pub job_id: String,
    pub state: JobState,
    /// Set only when outputs were downloaded
    pub output_dir: Option<PathBuf>,
    pub downloaded: Vec<PathBuf>,
    pub error_message: Option<String>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl TranscriptionOutcome {
    pub fn is_failed(&self) -> bool {
        self.state == JobState::Failed
    }
}

/// File names the inputs are uploaded under.
///
/// The service keys uploads by file name, so two inputs sharing one are rejected.
pub fn upload_file_names(files: &[PathBuf]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(files.len());

    for path in files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", path.display()))?;

        if !seen.insert(name.clone()) {
            anyhow::bail!(
                "Duplicate input file name {} ({}); rename one of the inputs",
                name,
                path.display()
            );
        }
        names.push(name);
    }

    Ok(names)
}

/// Remote batch speech-to-text service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToTextJobs: Send + Sync {
    /// Create a job with the given parameters
    async fn create_job(&self, parameters: &JobParameters) -> Result<JobStatus>;

    /// Upload input files to a created job
    async fn upload_files(&self, job_id: &str, files: &[PathBuf]) -> Result<()>;

    /// Start processing of uploaded files
    async fn start(&self, job_id: &str) -> Result<JobStatus>;

    /// Block until the job reaches a terminal state
    async fn wait_until_complete(&self, job_id: &str) -> Result<JobStatus>;

    /// Download every output of a finished job into `output_dir`
    async fn download_outputs(&self, job_id: &str, output_dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Drives one batch job from creation to downloaded outputs
pub struct TranscriptionPipeline {
    service: Box<dyn SpeechToTextJobs>,
    parameters: JobParameters,
    output_dir: PathBuf,
}

impl TranscriptionPipeline {
    /// Create a pipeline using the configured language, model and output directory
    pub fn new(config: &Config, service: Box<dyn SpeechToTextJobs>) -> Self {
        Self {
            service,
            parameters: JobParameters {
                language_code: config.transcription.language_code.clone(),
                model: config.transcription.model.clone(),
            },
            output_dir: config.transcription.output_dir.clone(),
        }
    }

    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.parameters.language_code = language_code.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.parameters.model = model.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn parameters(&self) -> &JobParameters {
        &self.parameters
    }

    /// Run the job over `files`; errors from any remote step propagate
    pub async fn run(&self, files: &[PathBuf]) -> Result<TranscriptionOutcome> {
        for file in files {
            check_file_accessible(file)?;
        }
        upload_file_names(files)?;

        let job = self
            .service
            .create_job(&self.parameters)
            .await
            .context("Failed to create transcription job")?;
        tracing::info!("Created job with ID: {}", job.job_id);

        self.service
            .upload_files(&job.job_id, files)
            .await
            .context("Failed to upload audio files")?;
        tracing::info!("All files uploaded successfully.");

        self.service
            .start(&job.job_id)
            .await
            .context("Failed to start transcription job")?;
        tracing::info!("Started processing for job ID: {}", job.job_id);

        let final_status = self.service.wait_until_complete(&job.job_id).await?;
        tracing::info!("Final job status: {}", final_status.job_state);

        if final_status.is_failed() {
            tracing::error!(
                "STT job failed: {}",
                final_status.error_message.as_deref().unwrap_or("no reason given")
            );
            return Ok(TranscriptionOutcome {
                job_id: job.job_id,
                state: final_status.job_state,
                output_dir: None,
                downloaded: Vec::new(),
                error_message: final_status.error_message,
                completed_at: chrono::Utc::now(),
            });
        }

        let downloaded = self
            .service
            .download_outputs(&job.job_id, &self.output_dir)
            .await
            .context("Failed to download job outputs")?;
        tracing::info!("All output files downloaded to: {}", self.output_dir.display());

        Ok(TranscriptionOutcome {
            job_id: job.job_id,
            state: final_status.job_state,
            output_dir: Some(self.output_dir.clone()),
            downloaded,
            error_message: None,
            completed_at: chrono::Utc::now(),
        })
    }
}
