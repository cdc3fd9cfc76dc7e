use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};

/// What to keep from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
}

impl MediaType {
    pub const CHOICES: &'static str = "video/audio";

    /// Case-insensitive parse; blank or unknown input yields the default.
    pub fn parse_or_default(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "" => Self::default(),
            "video" => Self::Video,
            "audio" => Self::Audio,
            other => {
                warn!("Unknown media type {:?}, using {}", other, Self::default());
                Self::default()
            }
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        })
    }
}

/// Video quality preference. Heights act as a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Best,
    Worst,
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "480")]
    P480,
    #[serde(rename = "360")]
    P360,
}

impl Quality {
    pub const CHOICES: &'static str = "best/worst/720/480/360";

    /// Case-insensitive parse accepting `720` or `720p`; blank or unknown
    /// input yields the default.
    pub fn parse_or_default(input: &str) -> Self {
        let lowered = input.trim().to_ascii_lowercase();
        let value = lowered.strip_suffix('p').unwrap_or(&lowered);
        match value {
            "" => Self::default(),
            "best" => Self::Best,
            "worst" => Self::Worst,
            "720" => Self::P720,
            "480" => Self::P480,
            "360" => Self::P360,
            _ => {
                warn!("Unknown quality {:?}, using {}", lowered, Self::default());
                Self::default()
            }
        }
    }

    /// Maximum height for the fixed-resolution choices.
    pub fn ceiling(self) -> Option<u32> {
        match self {
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
            Quality::P360 => Some(360),
            Quality::Best | Quality::Worst => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ceiling() {
            Some(height) => write!(f, "{}", height),
            None if *self == Quality::Worst => f.write_str("worst"),
            None => f.write_str("best"),
        }
    }
}

/// Trim a URL, rejecting it when nothing is left.
pub fn normalize_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::Validation("URL cannot be empty".to_string()));
    }
    Ok(url)
}

/// One download, built from user input and consumed by
/// [`build_fetch_options`](crate::options::build_fetch_options).
#[derive(Debug, Serialize)]
pub struct DownloadRequest {
    url: String,
    media_type: MediaType,
    quality: Quality,
    output_directory: PathBuf,
}

impl DownloadRequest {
    pub fn new(
        url: &str,
        media_type: MediaType,
        quality: Quality,
        output_directory: impl Into<PathBuf>,
    ) -> Result<Self> {
        let url = normalize_url(url)?;
        Ok(Self {
            url: url.to_string(),
            media_type,
            quality,
            output_directory: output_directory.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Only meaningful for video requests.
    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_is_case_insensitive() {
        assert_eq!(MediaType::parse_or_default("AUDIO"), MediaType::Audio);
        assert_eq!(MediaType::parse_or_default(" Video "), MediaType::Video);
    }

    #[test]
    fn unknown_media_type_falls_back_to_video() {
        for input in ["", "   ", "podcast", "mp3"] {
            assert_eq!(MediaType::parse_or_default(input), MediaType::Video, "{input:?}");
        }
    }

    #[test]
    fn quality_accepts_p_suffix() {
        assert_eq!(Quality::parse_or_default("720p"), Quality::P720);
        assert_eq!(Quality::parse_or_default("480P"), Quality::P480);
        assert_eq!(Quality::parse_or_default("360"), Quality::P360);
        assert_eq!(Quality::parse_or_default("WORST"), Quality::Worst);
    }

    #[test]
    fn unknown_quality_falls_back_to_best() {
        for input in ["", "1080", "4k", "p", "high"] {
            assert_eq!(Quality::parse_or_default(input), Quality::Best, "{input:?}");
        }
    }

    #[test]
    fn blank_url_is_rejected() {
        for url in ["", " ", "\t\n"] {
            let err = DownloadRequest::new(url, MediaType::Video, Quality::P720, "out")
                .expect_err("blank URL must fail");
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    #[test]
    fn url_is_trimmed() {
        let request = DownloadRequest::new(
            "  https://example.com/watch?v=abc \n",
            MediaType::Audio,
            Quality::Best,
            "out",
        )
        .unwrap();
        assert_eq!(request.url(), "https://example.com/watch?v=abc");
        assert_eq!(request.output_directory(), Path::new("out"));
    }
}
