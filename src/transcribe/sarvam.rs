use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::processor::JobPoller;
use super::{upload_file_names, JobParameters, JobStatus, SpeechToTextJobs};
use crate::config::Config;
use crate::{FetchscribeError, Result};

const JOB_PATH: &str = "speech-to-text/job/v1";

#[derive(Debug, Serialize)]
struct CreateJobRequest<'a> {
    job_parameters: &'a JobParameters,
    callback: Option<String>,
}

#[derive(Debug, Serialize)]
struct FilesRequest<'a> {
    job_id: &'a str,
    files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileUrl {
    file_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct UploadUrlsResponse {
    upload_urls: HashMap<String, FileUrl>,
    #[serde(default)]
    storage_container_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DownloadUrlsResponse {
    download_urls: HashMap<String, FileUrl>,
}

/// Sarvam AI batch speech-to-text client
pub struct SarvamClient {
    client: Client,
    base_url: String,
    api_key: String,
    poller: JobPoller,
}

impl SarvamClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, poller: JobPoller) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            poller,
        }
    }

    /// Build a client from the transcription config section
    pub fn from_config(config: &Config, show_progress: bool) -> Result<Self> {
        let api_key = config
            .transcription
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                FetchscribeError::Config(
                    "an API subscription key is required (--api-key, SARVAM_API_KEY or transcription.api_key)"
                        .to_string(),
                )
            })?;

        let poller = JobPoller::new(config.poll_interval(), config.max_poll_interval())
            .with_progress(show_progress);

        Ok(Self::new(&config.transcription.base_url, api_key, poller))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, JOB_PATH, path.trim_start_matches('/'))
            .trim_end_matches('/')
            .to_string()
    }

    fn job_endpoint(&self, job_id: &str, action: &str) -> String {
        self.endpoint(&format!("{}/{}", urlencoding::encode(job_id), action))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("api-subscription-key", &self.api_key)
    }

    /// Turn non-success responses into an API error carrying the body
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(FetchscribeError::Api {
            status: status.as_u16(),
            body,
        }
        .into())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorized(request).send().await?;
        let response = Self::check(response).await?;
        let parsed = response
            .json::<T>()
            .await
            .context("Failed to parse API response")?;
        Ok(parsed)
    }

    /// Current status of a job
    pub async fn status(&self, job_id: &str) -> Result<JobStatus> {
        self.send_json(self.client.get(self.job_endpoint(job_id, "status")))
            .await
            .with_context(|| format!("Failed to get status of job {}", job_id))
    }

    async fn upload_one(&self, path: &Path, url: &str, azure: bool) -> Result<()> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        tracing::debug!("Uploading {} ({} bytes)", path.display(), content.len());

        let mut request = self.client.put(url).body(content);
        if azure {
            request = request.header("x-ms-blob-type", "BlockBlob");
        }

        let response = request.send().await?;
        Self::check(response)
            .await
            .with_context(|| format!("Failed to upload {}", path.display()))?;
        Ok(())
    }

    /// Stream `url` into `<dest>.part`, renamed to `dest` once complete
    async fn download_one(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;
        let response = Self::check(response).await?;

        let mut partial = dest.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let streamed = async {
            let mut file = fs_err::File::create(&partial)?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)?;
            }
            file.flush()?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        if let Err(e) = streamed {
            fs_err::remove_file(&partial).ok();
            return Err(e.context(format!("Failed to download {}", dest.display())));
        }

        fs_err::rename(&partial, dest)?;
        Ok(())
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", path.display()))
}

#[async_trait]
impl SpeechToTextJobs for SarvamClient {
    async fn create_job(&self, parameters: &JobParameters) -> Result<JobStatus> {
        let body = CreateJobRequest {
            job_parameters: parameters,
            callback: None,
        };
        self.send_json(self.client.post(self.endpoint("")).json(&body))
            .await
    }

    async fn upload_files(&self, job_id: &str, files: &[PathBuf]) -> Result<()> {
        let names = upload_file_names(files)?;

        let urls: UploadUrlsResponse = self
            .send_json(self.client.post(self.endpoint("upload-files")).json(&FilesRequest {
                job_id,
                files: names.clone(),
            }))
            .await?;

        let azure = urls
            .storage_container_type
            .as_deref()
            .map(|kind| kind.eq_ignore_ascii_case("azure"))
            .unwrap_or(false);

        for (path, name) in files.iter().zip(names.iter()) {
            let target = urls
                .upload_urls
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("No upload URL returned for {}", name))?;
            self.upload_one(path, &target.file_url, azure).await?;
            tracing::info!("Uploaded {}", name);
        }

        Ok(())
    }

    async fn start(&self, job_id: &str) -> Result<JobStatus> {
        self.send_json(self.client.post(self.job_endpoint(job_id, "start")))
            .await
    }

    async fn wait_until_complete(&self, job_id: &str) -> Result<JobStatus> {
        self.poller
            .wait_for_completion(job_id, move || self.status(job_id))
            .await
    }

    async fn download_outputs(&self, job_id: &str, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let status = self.status(job_id).await?;
        let names = status.output_file_names();
        if names.is_empty() {
            tracing::warn!("Job {} lists no output files", job_id);
            return Ok(Vec::new());
        }

        let urls: DownloadUrlsResponse = self
            .send_json(self.client.post(self.endpoint("download-files")).json(&FilesRequest {
                job_id,
                files: names.clone(),
            }))
            .await?;

        fs_err::create_dir_all(output_dir)?;

        let mut downloaded = Vec::with_capacity(names.len());
        for name in &names {
            let source = urls
                .download_urls
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("No download URL returned for {}", name))?;
            let dest = output_dir.join(file_name_of(Path::new(name))?);
            self.download_one(&source.file_url, &dest).await?;
            tracing::info!("Downloaded {}", dest.display());
            downloaded.push(dest);
        }

        Ok(downloaded)
    }
}
