use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub mod youtube;

use crate::config::FetchConfig;
use crate::{FetchscribeError, Result};

/// Format selector for the combined audio+video variant
pub const VIDEO_FORMAT: &str = "232+233/231+233/230+233/best";

/// Format selector for the audio-only variant
pub const AUDIO_FORMAT: &str = "233/234/bestaudio/best";

/// Subtitle language patterns requested by the audio variant
pub const AUDIO_SUBTITLE_LANGS: &[&str] = &[
    "en.*", "hi-orig.*", "bn-orig.*", "gu-orig.*", "kn-orig.*", "ml-orig.*",
    "mr-orig.*", "or-orig.*", "ta-orig.*", "te-orig.*", "pa.*",
];

/// Stream variant to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum FetchProfile {
    /// Best combined audio+video stream with subtitles
    Video,
    /// Audio-only stream with subtitles in Indic + English languages
    Audio,
}

impl FetchProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchProfile::Video => "video",
            FetchProfile::Audio => "audio",
        }
    }

    /// Ordered format fallback list understood by the engine
    pub fn format_selector(&self) -> &'static str {
        match self {
            FetchProfile::Video => VIDEO_FORMAT,
            FetchProfile::Audio => AUDIO_FORMAT,
        }
    }

    /// Subtitle language filter; `None` leaves the engine default in place
    pub fn subtitle_langs(&self) -> Option<Vec<String>> {
        match self {
            FetchProfile::Video => None,
            FetchProfile::Audio => Some(
                AUDIO_SUBTITLE_LANGS.iter().map(|s| s.to_string()).collect(),
            ),
        }
    }
}

impl std::fmt::Display for FetchProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the extraction engine is configured with for one run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub format: String,
    pub subtitle_langs: Option<Vec<String>>,
    pub subtitle_format: String,
    pub staging_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub socket_timeout_secs: u64,
    pub retries: u64,
    pub fragment_retries: u64,
    pub concurrent_fragments: u32,
    pub force_ipv4: bool,
}

impl EngineOptions {
    pub fn for_profile(profile: FetchProfile, config: &FetchConfig, staging_dir: &Path) -> Self {
        Self {
            format: profile.format_selector().to_string(),
            subtitle_langs: profile.subtitle_langs(),
            subtitle_format: config.subtitle_format.clone(),
            staging_dir: staging_dir.to_path_buf(),
            cache_dir: config.cache_dir.clone(),
            socket_timeout_secs: config.socket_timeout_secs,
            retries: config.retries,
            fragment_retries: config.fragment_retries,
            concurrent_fragments: config.concurrent_fragments,
            force_ipv4: config.force_ipv4,
        }
    }

    /// Output template for the media file: `<staging>/<id>/<id>.<ext>`
    pub fn media_template(&self) -> String {
        self.staging_dir
            .join("%(id)s")
            .join("%(id)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }

    /// Output template for the info json sidecar: `<staging>/<id>/metadata.<ext>`
    pub fn infojson_template(&self) -> String {
        self.staging_dir
            .join("%(id)s")
            .join("metadata.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

/// Trait for the external engine that negotiates and downloads streams
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Download media, subtitles and metadata for `url` into the staging layout
    async fn extract(&self, url: &str, options: &EngineOptions) -> Result<()>;

    /// Get the name of this engine
    fn name(&self) -> &'static str;
}

/// Canonical source URL for a content identifier
pub fn content_url(content_id: &str) -> String {
    format!("https://youtu.be/{}", content_id)
}

/// Check that an identifier is safe to use as a directory name
pub fn validate_content_id(content_id: &str) -> Result<()> {
    let valid = !content_id.is_empty()
        && content_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !valid {
        return Err(FetchscribeError::InvalidContentId(content_id.to_string()).into());
    }
    Ok(())
}

/// Accept a bare identifier or a YouTube URL and return the identifier
pub fn content_id_from_input(input: &str) -> Result<String> {
    let input = input.trim();

    if !input.contains("://") {
        validate_content_id(input)?;
        return Ok(input.to_string());
    }

    let parsed = Url::parse(input)
        .map_err(|_| FetchscribeError::InvalidContentId(input.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchscribeError::InvalidContentId(input.to_string()).into());
    }

    let host = parsed.host_str().unwrap_or("").to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let id = match host {
        "youtu.be" => segments.first().map(|s| s.to_string()),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => match segments.as_slice() {
            ["watch"] => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            ["shorts", id, ..] | ["embed", id, ..] | ["v", id, ..] | ["live", id, ..] => {
                Some(id.to_string())
            }
            _ => None,
        },
        _ => None,
    };

    let id = id.ok_or_else(|| FetchscribeError::InvalidContentId(input.to_string()))?;
    validate_content_id(&id)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_differ_only_in_format_and_languages() {
        let config = FetchConfig::default();
        let staging = Path::new("/srv/video_output");
        let video = EngineOptions::for_profile(FetchProfile::Video, &config, staging);
        let audio = EngineOptions::for_profile(FetchProfile::Audio, &config, staging);

        assert_eq!(video.format, VIDEO_FORMAT);
        assert_eq!(audio.format, AUDIO_FORMAT);
        assert_eq!(video.subtitle_langs, None);
        assert_eq!(audio.subtitle_langs.as_ref().map(|l| l.len()), Some(11));

        let normalized = EngineOptions {
            format: video.format.clone(),
            subtitle_langs: video.subtitle_langs.clone(),
            ..audio
        };
        assert_eq!(normalized, video);
    }

    #[test]
    fn templates_nest_under_identifier() {
        let options = EngineOptions::for_profile(
            FetchProfile::Audio,
            &FetchConfig::default(),
            Path::new("/srv/video_output"),
        );
        assert_eq!(options.media_template(), "/srv/video_output/%(id)s/%(id)s.%(ext)s");
        assert_eq!(options.infojson_template(), "/srv/video_output/%(id)s/metadata.%(ext)s");
    }

    #[test]
    fn test_content_url() {
        assert_eq!(content_url("5TBgsf5chxQ"), "https://youtu.be/5TBgsf5chxQ");
    }

    #[test]
    fn bare_identifiers_are_validated() {
        assert_eq!(content_id_from_input("5TBgsf5chxQ").unwrap(), "5TBgsf5chxQ");
        assert_eq!(content_id_from_input(" hY-sBLhEpbw ").unwrap(), "hY-sBLhEpbw");
        assert!(content_id_from_input("").is_err());
        assert!(content_id_from_input("../etc").is_err());
        assert!(content_id_from_input("a/b").is_err());
    }

    #[test]
    fn identifiers_are_pulled_from_urls() {
        let cases = [
            ("https://youtu.be/9p75x0UZUCg", "9p75x0UZUCg"),
            ("https://www.youtube.com/watch?v=hY-sBLhEpbw", "hY-sBLhEpbw"),
            ("https://m.youtube.com/watch?feature=share&v=abc_123", "abc_123"),
            ("https://youtube.com/shorts/xyz987", "xyz987"),
            ("https://www.youtube.com/embed/emb-1", "emb-1"),
        ];
        for (input, expected) in cases {
            assert_eq!(content_id_from_input(input).unwrap(), expected, "{}", input);
        }
    }

    #[test]
    fn foreign_urls_are_rejected() {
        assert!(content_id_from_input("https://example.com/watch?v=abc").is_err());
        assert!(content_id_from_input("https://www.youtube.com/feed/trending").is_err());
        assert!(content_id_from_input("ftp://youtu.be/abc").is_err());
    }
}
