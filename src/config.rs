use std::path::PathBuf;

pub const DEFAULT_OUTPUT_DIR: &str = "downloads";
pub const DEFAULT_YT_DLP: &str = "yt-dlp";
pub const DEFAULT_AUDIO_BITRATE: u32 = 192;

/// Settings for a single invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the finished file lands in
    pub output_dir: PathBuf,
    /// yt-dlp executable
    pub yt_dlp: PathBuf,
    /// Explicit ffmpeg binary; looked up on PATH when unset
    pub ffmpeg_location: Option<PathBuf>,
    /// MP3 bitrate in kbps for audio downloads
    pub audio_bitrate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            yt_dlp: PathBuf::from(DEFAULT_YT_DLP),
            ffmpeg_location: None,
            audio_bitrate: DEFAULT_AUDIO_BITRATE,
        }
    }
}
