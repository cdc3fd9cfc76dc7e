use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod download;
mod error;
mod options;
mod orchestrator;
mod output;
mod prompt;
mod request;

use config::Config;
use orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "media-dl")]
#[command(about = "Download a video or its audio track with yt-dlp", version)]
struct Cli {
    /// Directory the finished file is written to
    #[arg(short, long, env = "MEDIA_DL_OUTPUT_DIR", default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// yt-dlp executable
    #[arg(long = "yt-dlp", env = "MEDIA_DL_YT_DLP", default_value = config::DEFAULT_YT_DLP)]
    yt_dlp: PathBuf,

    /// ffmpeg binary or its directory (searched on PATH when omitted)
    #[arg(long, env = "MEDIA_DL_FFMPEG")]
    ffmpeg_location: Option<PathBuf>,

    /// MP3 bitrate in kbps for audio downloads
    #[arg(long, env = "MEDIA_DL_AUDIO_BITRATE", default_value_t = config::DEFAULT_AUDIO_BITRATE)]
    audio_bitrate: u32,

    /// Log debug details
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            output_dir: cli.output_dir,
            yt_dlp: cli.yt_dlp,
            ffmpeg_location: cli.ffmpeg_location,
            audio_bitrate: cli.audio_bitrate,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut orchestrator = Orchestrator::new(Config::from(cli));
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout();

    match orchestrator.run(&mut input, &mut output).await {
        Ok(path) => {
            println!("Saved to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

/// Logs go to stderr; stdout belongs to the prompts.
fn init_tracing(verbose: bool) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::try_new(directives).context("Invalid RUST_LOG")?,
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new("info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["media-dl"]).unwrap();
        let config = Config::from(cli);
        assert_eq!(config.output_dir, PathBuf::from("downloads"));
        assert_eq!(config.yt_dlp, PathBuf::from("yt-dlp"));
        assert_eq!(config.audio_bitrate, 192);
        assert!(config.ffmpeg_location.is_none());
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::try_parse_from([
            "media-dl",
            "-o",
            "/srv/media",
            "--yt-dlp",
            "/opt/yt-dlp",
            "--ffmpeg-location",
            "/opt/ffmpeg",
            "--audio-bitrate",
            "320",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let config = Config::from(cli);
        assert_eq!(config.output_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.yt_dlp, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(config.ffmpeg_location, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(config.audio_bitrate, 320);
    }
}
