use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can end a run early.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable user input
    #[error("invalid input: {0}")]
    Validation(String),

    /// Output directory could not be created or written
    #[error("cannot use output location {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Reading prompts from the terminal failed
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ctrl-C during the download
    #[error("download cancelled by user")]
    Interrupted,
}

/// Failures reported by the fetch step.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The resource could not be reached
    #[error("network error: {0}")]
    Network(String),

    /// The resource was reached but could not be extracted
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Audio conversion failed, usually because ffmpeg is missing
    #[error("transcode error: {0}. Install the audio transcoder (ffmpeg) and try again")]
    Transcode(String),

    /// The fetcher program could not be started
    #[error("cannot run {program}: {source}. Install yt-dlp or pass --yt-dlp")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io(_) => 1,
            Error::Validation(_) => 2,
            Error::Filesystem { .. } => 3,
            Error::Download(DownloadError::Network(_)) => 4,
            Error::Download(DownloadError::Extraction(_)) => 5,
            Error::Download(DownloadError::Transcode(_)) => 6,
            Error::Download(DownloadError::Unavailable { .. }) => 7,
            Error::Interrupted => 130,
        }
    }
}
