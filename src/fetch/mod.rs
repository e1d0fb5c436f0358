use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::extractors::{
    content_url, validate_content_id, EngineOptions, ExtractionEngine, FetchProfile,
};
use crate::staging;
use crate::{FetchscribeError, Result};

/// Media fetch pipeline: engine call, on-disk verification, materialization.
///
/// Every entry point returns a verdict instead of an error so callers can
/// run many identifiers and check each result.
pub struct FetchPipeline {
    config: Config,
    engine: Box<dyn ExtractionEngine>,
    staging_dir: PathBuf,
    show_progress: bool,
}

impl FetchPipeline {
    /// Create a new fetch pipeline
    pub fn new(config: Config, engine: Box<dyn ExtractionEngine>) -> Result<Self> {
        let staging_dir = config.staging_dir()?;

        Ok(Self {
            config,
            engine,
            staging_dir,
            show_progress: true,
        })
    }

    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Fetch the combined audio+video variant
    pub async fn process_video(&self, content_id: &str, output_path: &Path) -> bool {
        self.process(content_id, output_path, FetchProfile::Video).await
    }

    /// Fetch the audio-only variant
    pub async fn process_audio(&self, content_id: &str, output_path: &Path) -> bool {
        self.process(content_id, output_path, FetchProfile::Audio).await
    }

    /// Fetch one identifier and copy it to `output_path/<content_id>/`
    pub async fn process(&self, content_id: &str, output_path: &Path, profile: FetchProfile) -> bool {
        match self.try_process(content_id, output_path, profile).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::error!(
                    "Exception occurred while processing video {}: {:#}",
                    content_id,
                    e
                );
                false
            }
        }
    }

    /// Fetch identifiers one after another, one verdict each
    pub async fn process_batch(
        &self,
        content_ids: &[String],
        output_path: &Path,
        profile: FetchProfile,
    ) -> Vec<(String, bool)> {
        let mut verdicts = Vec::with_capacity(content_ids.len());
        for content_id in content_ids {
            let ok = self.process(content_id, output_path, profile).await;
            verdicts.push((content_id.clone(), ok));
        }
        verdicts
    }

    async fn try_process(
        &self,
        content_id: &str,
        output_path: &Path,
        profile: FetchProfile,
    ) -> Result<bool> {
        validate_content_id(content_id)?;

        let video_url = content_url(content_id);
        fs_err::create_dir_all(&self.staging_dir)?;

        let options = EngineOptions::for_profile(profile, &self.config.fetch, &self.staging_dir);

        tracing::info!(
            "Fetching {} ({}) with {}",
            video_url,
            profile,
            self.engine.name()
        );

        let progress = self.spinner(format!("Downloading {} with {}...", content_id, self.engine.name()));
        let extracted = self.engine.extract(&video_url, &options).await;
        progress.finish_and_clear();
        extracted?;

        let Some(media_file_name) = staging::get_media_file_name(&self.staging_dir, content_id) else {
            self.report_retained(content_id);
            return Err(FetchscribeError::MediaMissing(content_id.to_string()).into());
        };

        tracing::info!("Successfully downloaded video {}", content_id);
        tracing::debug!("Media file for {}: {}", content_id, media_file_name);

        staging::save_locally(&self.staging_dir, content_id, output_path)?;
        Ok(true)
    }

    /// Partial artifacts stay in staging so a later run can continue from them
    fn report_retained(&self, content_id: &str) {
        let retained = staging::list_staged_files(&self.staging_dir, content_id);
        if !retained.is_empty() {
            tracing::warn!(
                "Keeping partial files for {} in {}: {}",
                content_id,
                self.staging_dir.join(content_id).display(),
                retained.join(", ")
            );
        }
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            progress.set_style(style);
        }
        progress.set_message(message);
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}
