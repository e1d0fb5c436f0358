use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::FetchscribeError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Media fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Batch transcription settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Path or name of the yt-dlp executable
    pub yt_dlp_path: String,

    /// Staging directory (defaults to `video_output` next to the executable)
    pub staging_dir: Option<PathBuf>,

    /// Cache directory handed to the engine
    pub cache_dir: PathBuf,

    /// Per-socket timeout in seconds
    pub socket_timeout_secs: u64,

    /// Whole-download retries
    pub retries: u64,

    /// Retries per fragment
    pub fragment_retries: u64,

    /// Fragments fetched concurrently by the engine
    pub concurrent_fragments: u32,

    /// Force IPv4 transport
    pub force_ipv4: bool,

    /// Subtitle file format
    pub subtitle_format: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            staging_dir: None,
            cache_dir: PathBuf::from("/tmp"),
            socket_timeout_secs: 60,
            retries: 100_000_000,
            fragment_retries: 100_000_000,
            concurrent_fragments: 20,
            force_ipv4: true,
            subtitle_format: "vtt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// API base URL
    pub base_url: String,

    /// API subscription key
    pub api_key: Option<String>,

    /// Default language code
    pub language_code: String,

    /// Default model identifier
    pub model: String,

    /// Where job outputs are downloaded
    pub output_dir: PathBuf,

    /// First status poll delay in seconds
    pub poll_interval_secs: u64,

    /// Upper bound for the poll delay in seconds
    pub max_poll_interval_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sarvam.ai".to_string(),
            api_key: None,
            language_code: "hi-IN".to_string(),
            model: "saarika:v2.5".to_string(),
            output_dir: PathBuf::from("./out"),
            poll_interval_secs: 5,
            max_poll_interval_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("fetchscribe").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = Url::parse(&self.transcription.base_url).map_err(|_| {
            FetchscribeError::Config(format!(
                "transcription.base_url is not a valid URL: {}",
                self.transcription.base_url
            ))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(FetchscribeError::Config(
                "transcription.base_url must use HTTP or HTTPS protocol".to_string(),
            )
            .into());
        }

        if self.fetch.concurrent_fragments == 0 {
            return Err(FetchscribeError::Config(
                "fetch.concurrent_fragments must be at least 1".to_string(),
            )
            .into());
        }

        if self.transcription.poll_interval_secs == 0 {
            return Err(FetchscribeError::Config(
                "transcription.poll_interval_secs must be at least 1".to_string(),
            )
            .into());
        }

        if self.transcription.max_poll_interval_secs < self.transcription.poll_interval_secs {
            return Err(FetchscribeError::Config(
                "transcription.max_poll_interval_secs must not be below poll_interval_secs"
                    .to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Staging root: configured value or `video_output` beside the executable
    pub fn staging_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.fetch.staging_dir {
            return Ok(dir.clone());
        }

        let exe = std::env::current_exe()
            .context("Could not determine executable location")?;
        let base = exe
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(base.join("video_output"))
    }

    /// Initial delay between job status checks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.transcription.poll_interval_secs)
    }

    /// Maximum delay between job status checks
    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_secs(self.transcription.max_poll_interval_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.fetch.yt_dlp_path);
        match self.staging_dir() {
            Ok(dir) => println!("  Staging Dir: {}", dir.display()),
            Err(_) => println!("  Staging Dir: <unresolved>"),
        }
        println!("  Concurrent Fragments: {}", self.fetch.concurrent_fragments);
        println!("  Socket Timeout: {}s", self.fetch.socket_timeout_secs);
        println!("  API Base URL: {}", self.transcription.base_url);
        println!(
            "  API Key: {}",
            if self.transcription.api_key.is_some() { "<set>" } else { "<unset>" }
        );
        println!("  Language: {}", self.transcription.language_code);
        println!("  Model: {}", self.transcription.model);
        println!("  Output Dir: {}", self.transcription.output_dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_fetch_policy() {
        let config = Config::default();
        assert_eq!(config.fetch.retries, 100_000_000);
        assert_eq!(config.fetch.fragment_retries, 100_000_000);
        assert_eq!(config.fetch.socket_timeout_secs, 60);
        assert_eq!(config.fetch.concurrent_fragments, 20);
        assert!(config.fetch.force_ipv4);
        assert_eq!(config.transcription.language_code, "hi-IN");
        assert_eq!(config.transcription.model, "saarika:v2.5");
        assert_eq!(config.transcription.output_dir, PathBuf::from("./out"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config = Config::from_yaml("transcription:\n  language_code: ta-IN\n").unwrap();
        assert_eq!(config.transcription.language_code, "ta-IN");
        assert_eq!(config.transcription.model, "saarika:v2.5");
        assert_eq!(config.fetch.yt_dlp_path, "yt-dlp");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_yaml("transcription:\n  base_url: not-a-url\n").is_err());
        assert!(Config::from_yaml("transcription:\n  base_url: ftp://example.com\n").is_err());
        assert!(Config::from_yaml("fetch:\n  concurrent_fragments: 0\n").is_err());
        assert!(Config::from_yaml(
            "transcription:\n  poll_interval_secs: 10\n  max_poll_interval_secs: 5\n"
        )
        .is_err());
    }

    #[test]
    fn configured_staging_dir_wins() {
        let mut config = Config::default();
        config.fetch.staging_dir = Some(PathBuf::from("/srv/staging"));
        assert_eq!(config.staging_dir().unwrap(), PathBuf::from("/srv/staging"));

        config.fetch.staging_dir = None;
        assert!(config.staging_dir().unwrap().ends_with("video_output"));
    }
}
