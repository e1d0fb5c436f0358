use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use super::{EngineOptions, ExtractionEngine};
use crate::{FetchscribeError, Result};

/// Extraction engine backed by the yt-dlp executable
pub struct YtDlpEngine {
    yt_dlp_path: String,
}

impl YtDlpEngine {
    pub fn new() -> Self {
        Self::with_path("yt-dlp")
    }

    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: path.into(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Map engine options onto yt-dlp flags
    pub fn build_args(url: &str, options: &EngineOptions) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--format".into(), options.format.clone(),
            // Pick up partial downloads from earlier runs
            "--continue".into(),
            "--abort-on-error".into(),
            "--concurrent-fragments".into(), options.concurrent_fragments.to_string(),
            "--output".into(), options.media_template(),
            "--output".into(), format!("infojson:{}", options.infojson_template()),
            "--restrict-filenames".into(),
            "--cache-dir".into(), options.cache_dir.to_string_lossy().into_owned(),
            "--write-subs".into(),
            "--write-auto-subs".into(),
            "--write-info-json".into(),
            "--sub-format".into(), options.subtitle_format.clone(),
            "--no-playlist".into(),
            "--quiet".into(),
            "--no-progress".into(),
            "--socket-timeout".into(), options.socket_timeout_secs.to_string(),
            "--fragment-retries".into(), options.fragment_retries.to_string(),
            "--retries".into(), options.retries.to_string(),
            "--skip-unavailable-fragments".into(),
            "--no-part".into(),
        ];

        if let Some(langs) = &options.subtitle_langs {
            args.push("--sub-langs".into());
            args.push(langs.join(","));
        }

        if options.force_ipv4 {
            args.push("--force-ipv4".into());
        }

        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    async fn extract(&self, url: &str, options: &EngineOptions) -> Result<()> {
        let args = Self::build_args(url, options);
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                FetchscribeError::ExtractionFailed(format!(
                    "could not run {}: {}",
                    self.yt_dlp_path, e
                ))
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(FetchscribeError::ExtractionFailed(error.trim().to_string()).into());
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::extractors::FetchProfile;
    use std::path::Path;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn audio_args_carry_languages_and_retry_policy() {
        let options = EngineOptions::for_profile(
            FetchProfile::Audio,
            &FetchConfig::default(),
            Path::new("/srv/video_output"),
        );
        let args = YtDlpEngine::build_args("https://youtu.be/5TBgsf5chxQ", &options);

        assert_eq!(value_after(&args, "--format"), Some("233/234/bestaudio/best"));
        assert_eq!(value_after(&args, "--retries"), Some("100000000"));
        assert_eq!(value_after(&args, "--fragment-retries"), Some("100000000"));
        assert_eq!(value_after(&args, "--socket-timeout"), Some("60"));
        assert_eq!(value_after(&args, "--concurrent-fragments"), Some("20"));
        assert_eq!(value_after(&args, "--sub-format"), Some("vtt"));
        assert_eq!(value_after(&args, "--cache-dir"), Some("/tmp"));
        let langs = value_after(&args, "--sub-langs").unwrap();
        assert!(langs.starts_with("en.*,hi-orig.*"));
        assert!(langs.ends_with("te-orig.*,pa.*"));

        for flag in [
            "--continue", "--write-subs", "--write-auto-subs", "--write-info-json",
            "--no-playlist", "--force-ipv4", "--no-part", "--skip-unavailable-fragments",
        ] {
            assert!(args.iter().any(|a| a == flag), "missing {}", flag);
        }
        assert!(args.contains(&"infojson:/srv/video_output/%(id)s/metadata.%(ext)s".to_string()));
        assert_eq!(args.last().map(|s| s.as_str()), Some("https://youtu.be/5TBgsf5chxQ"));
    }

    #[test]
    fn video_args_leave_subtitle_languages_to_the_engine() {
        let mut config = FetchConfig::default();
        config.force_ipv4 = false;
        let options =
            EngineOptions::for_profile(FetchProfile::Video, &config, Path::new("/srv/video_output"));
        let args = YtDlpEngine::build_args("https://youtu.be/abc", &options);

        assert_eq!(value_after(&args, "--format"), Some("232+233/231+233/230+233/best"));
        assert!(!args.iter().any(|a| a == "--sub-langs"));
        assert!(!args.iter().any(|a| a == "--force-ipv4"));
    }

    #[tokio::test]
    async fn missing_binary_is_an_extraction_error() {
        let engine = YtDlpEngine::with_path("/nonexistent/yt-dlp-binary");
        assert!(!engine.check_availability().await);

        let options = EngineOptions::for_profile(
            FetchProfile::Audio,
            &FetchConfig::default(),
            Path::new("/tmp/fetchscribe-staging"),
        );
        let err = engine.extract("https://youtu.be/abc", &options).await.unwrap_err();
        assert!(err.downcast_ref::<FetchscribeError>().is_some());
    }
}
