use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::request::{DownloadRequest, MediaType, Quality};

/// yt-dlp output template; the file is renamed after the title once done.
const OUTPUT_TEMPLATE: &str = "%(id)s.%(ext)s";

/// Stream selection handed to yt-dlp's `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSelector {
    /// Best video merged with best audio, else best single file
    Best,
    /// Lowest quality video and audio
    Worst,
    /// Best stream no taller than the ceiling. Lower resolutions are
    /// acceptable; anything above the ceiling never is.
    Ceiling(u32),
    /// Best audio-only stream
    BestAudio,
}

impl FormatSelector {
    /// Whether a stream of the given height satisfies this selector.
    ///
    /// Streams with unknown height only pass selectors without a ceiling.
    pub fn admits(&self, height: Option<u32>) -> bool {
        match (self, height) {
            (FormatSelector::Ceiling(max), Some(h)) => h <= *max,
            (FormatSelector::Ceiling(_), None) => false,
            _ => true,
        }
    }
}

impl fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatSelector::Best => f.write_str("bestvideo+bestaudio/best"),
            FormatSelector::Worst => f.write_str("worstvideo+worstaudio/worst"),
            FormatSelector::Ceiling(h) => {
                write!(f, "bestvideo[height<={h}]+bestaudio/best[height<={h}]")
            }
            FormatSelector::BestAudio => f.write_str("bestaudio/best"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Mp3,
}

impl AudioCodec {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
        }
    }
}

/// Work done after the raw stream is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum PostProcessor {
    /// Transcode to an audio-only file; needs ffmpeg
    ExtractAudio { codec: AudioCodec, bitrate_kbps: u32 },
}

/// Everything the fetcher needs for one download.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOptions {
    pub url: String,
    pub format: FormatSelector,
    pub output_directory: PathBuf,
    pub postprocessors: Vec<PostProcessor>,
    pub no_playlist: bool,
    pub yt_dlp: PathBuf,
    pub ffmpeg_location: Option<PathBuf>,
}

/// Translate a request into fetcher options. Consumes the request.
pub fn build_fetch_options(request: DownloadRequest, config: &Config) -> FetchOptions {
    let (format, postprocessors) = match request.media_type() {
        MediaType::Audio => (
            FormatSelector::BestAudio,
            vec![PostProcessor::ExtractAudio {
                codec: AudioCodec::Mp3,
                bitrate_kbps: config.audio_bitrate,
            }],
        ),
        MediaType::Video => {
            let format = match request.quality() {
                Quality::Best => FormatSelector::Best,
                Quality::Worst => FormatSelector::Worst,
                q => q.ceiling().map_or(FormatSelector::Best, FormatSelector::Ceiling),
            };
            (format, Vec::new())
        }
    };

    FetchOptions {
        url: request.url().to_string(),
        format,
        output_directory: request.output_directory().to_path_buf(),
        postprocessors,
        no_playlist: true,
        yt_dlp: config.yt_dlp.clone(),
        ffmpeg_location: config.ffmpeg_location.clone(),
    }
}

impl FetchOptions {
    pub fn needs_transcoder(&self) -> bool {
        !self.postprocessors.is_empty()
    }

    /// Extension the finished file must carry, when a post-processor fixes it.
    pub fn expected_extension(&self) -> Option<&'static str> {
        self.postprocessors.iter().find_map(|pp| match pp {
            PostProcessor::ExtractAudio { codec, .. } => Some(codec.extension()),
        })
    }

    pub fn output_template(&self) -> PathBuf {
        self.output_directory.join(OUTPUT_TEMPLATE)
    }

    /// Command-line arguments for yt-dlp, URL last.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--format".into(), self.format.to_string().into()];

        if self.no_playlist {
            args.push("--no-playlist".into());
        }

        for pp in &self.postprocessors {
            match pp {
                PostProcessor::ExtractAudio {
                    codec,
                    bitrate_kbps,
                } => {
                    args.extend([
                        "--extract-audio".into(),
                        "--audio-format".into(),
                        codec.extension().into(),
                        "--audio-quality".into(),
                        format!("{bitrate_kbps}K").into(),
                    ]);
                }
            }
        }

        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.as_os_str().to_owned());
        }

        args.extend([
            "--output".into(),
            self.output_template().into_os_string(),
            // --print implies --simulate and --quiet; --progress brings the
            // progress lines back. Any non-JSON stdout line is relayed too.
            "--no-simulate".into(),
            "--progress".into(),
            "--newline".into(),
            "--print".into(),
            "after_move:%(.{id,title,ext,height,filepath})j".into(),
            "--".into(),
            self.url.clone().into(),
        ]);

        args
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}
