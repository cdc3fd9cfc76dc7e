use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{DownloadError, Error, Result};
use crate::options::FetchOptions;
use crate::output::{ensure_directory, output_filename, resolve_output_path};

/// What yt-dlp prints once the file is in its final place.
#[derive(Debug, Deserialize)]
struct Fetched {
    title: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    filepath: PathBuf,
}

/// Download with yt-dlp and return the path of the finished file.
///
/// Runs the fetcher exactly once. The result is renamed to the sanitized
/// title inside the output directory.
pub async fn execute(options: FetchOptions) -> Result<PathBuf> {
    if options.needs_transcoder() {
        let ffmpeg = find_transcoder(options.ffmpeg_location.as_deref())?;
        debug!("Using transcoder at {}", ffmpeg.display());
    }
    ensure_directory(options.output_directory())?;

    info!("Downloading {} with format {}", options.url, options.format);
    debug!(
        "yt-dlp options: {}",
        serde_json::to_string(&options).unwrap_or_default()
    );

    let mut child = Command::new(&options.yt_dlp)
        .args(options.to_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| DownloadError::Unavailable {
            program: options.yt_dlp.display().to_string(),
            source,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| lost_pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| lost_pipe("stderr"))?;

    // Both pipes drained together so neither fills up and stalls the child.
    let (printed, diagnostics) = tokio::join!(
        collect_lines(stdout, |line| {
            if !line.trim_start().starts_with('{') {
                println!("{}", line);
            }
        }),
        collect_lines(stderr, |line| eprintln!("{}", line)),
    );

    let status = child
        .wait()
        .await
        .map_err(|e| DownloadError::Extraction(format!("lost track of yt-dlp: {}", e)))?;
    let printed = printed.map_err(|e| DownloadError::Extraction(format!("reading yt-dlp output: {}", e)))?;
    let diagnostics =
        diagnostics.map_err(|e| DownloadError::Extraction(format!("reading yt-dlp diagnostics: {}", e)))?;

    if !status.success() {
        let err = classify_failure(&diagnostics.join("\n"));
        warn!("yt-dlp exited with {}: {}", status, err);
        return Err(err.into());
    }

    let fetched = parse_fetched(&printed).ok_or_else(|| {
        DownloadError::Extraction("yt-dlp did not report a downloaded file".to_string())
    })?;
    finalize(&options, fetched).await
}

fn lost_pipe(name: &str) -> DownloadError {
    DownloadError::Extraction(format!("yt-dlp {} was not captured", name))
}

/// Locate ffmpeg, preferring an explicit location.
pub fn find_transcoder(location: Option<&Path>) -> std::result::Result<PathBuf, DownloadError> {
    match location {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(DownloadError::Transcode(format!(
            "ffmpeg not found at {}",
            path.display()
        ))),
        None => which::which("ffmpeg")
            .map_err(|_| DownloadError::Transcode("ffmpeg not found on PATH".to_string())),
    }
}

/// Read a pipe to the end, handing each line to `relay` as it arrives.
///
/// Bytes that are not UTF-8 are replaced rather than ending the read.
async fn collect_lines<R, F>(pipe: R, relay: F) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
    F: Fn(&str),
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    let mut collected = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        relay(&line);
        collected.push(line);
    }
    Ok(collected)
}

/// The last JSON record on stdout describes the finished file.
fn parse_fetched(lines: &[String]) -> Option<Fetched> {
    lines
        .iter()
        .rev()
        .find_map(|line| serde_json::from_str::<Fetched>(line.trim()).ok())
}

async fn finalize(options: &FetchOptions, fetched: Fetched) -> Result<PathBuf> {
    let ext = fetched
        .filepath
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .or(fetched.ext)
        .unwrap_or_default();

    if let Some(expected) = options.expected_extension() {
        if !ext.eq_ignore_ascii_case(expected) {
            return Err(DownloadError::Transcode(format!(
                "expected a .{} file but yt-dlp produced {}",
                expected,
                fetched.filepath.display()
            ))
            .into());
        }
    }

    if !options.format.admits(fetched.height) {
        match fetched.height {
            Some(height) => {
                if let Err(e) = tokio::fs::remove_file(&fetched.filepath).await {
                    warn!("Could not remove {}: {}", fetched.filepath.display(), e);
                }
                return Err(DownloadError::Extraction(format!(
                    "yt-dlp picked a {}p stream, above the requested {}",
                    height, options.format
                ))
                .into());
            }
            None => warn!("yt-dlp did not report the stream height; cannot check the ceiling"),
        }
    }

    let title = fetched.title.as_deref().unwrap_or_default();
    let target = resolve_output_path(options.output_directory(), &output_filename(title, &ext))?;

    if target != fetched.filepath {
        debug!("Renaming {} to {}", fetched.filepath.display(), target.display());
        tokio::fs::rename(&fetched.filepath, &target)
            .await
            .map_err(|e| Error::filesystem(&target, e))?;
    }

    Ok(target)
}

const TRANSCODE_MARKERS: &[&str] = &[
    "ffmpeg not found",
    "ffprobe and ffmpeg not found",
    "ffmpeg is not installed",
    "merging of multiple formats but ffmpeg",
    "postprocessing:",
    "audio conversion failed",
];

const RESTRICTED_MARKERS: &[&str] = &[
    "http error 4",
    "private video",
    "sign in",
    "login required",
    "members-only",
    "geo restrict",
    "not available in your country",
];

const NETWORK_MARKERS: &[&str] = &[
    "unable to download webpage",
    "urlopen error",
    "timed out",
    "connection refused",
    "connection reset",
    "name or service not known",
    "temporary failure in name resolution",
    "nodename nor servname",
    "getaddrinfo failed",
    "failed to resolve",
    "network is unreachable",
    "no route to host",
    "http error 5",
];

/// Map yt-dlp diagnostics to a failure kind.
///
/// Only `ERROR:` lines are considered when there are any, so warnings such
/// as a missing ffmpeg on a run that never needed it do not decide the kind.
pub fn classify_failure(stderr: &str) -> DownloadError {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| is_error_line(l))
        .collect();
    let lower = if errors.is_empty() {
        stderr.to_lowercase()
    } else {
        errors.join("\n").to_lowercase()
    };
    let message = error_message(stderr);
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(TRANSCODE_MARKERS) {
        DownloadError::Transcode(message)
    } else if has(RESTRICTED_MARKERS) {
        DownloadError::Extraction(message)
    } else if has(NETWORK_MARKERS) {
        DownloadError::Network(message)
    } else {
        DownloadError::Extraction(message)
    }
}

fn is_error_line(line: &str) -> bool {
    line.get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("error:"))
}

/// The last `ERROR:` line, or the last non-empty line.
fn error_message(stderr: &str) -> String {
    let last_error = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| is_error_line(l));

    match last_error {
        Some(line) => line[6..].trim().to_string(),
        None => stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("yt-dlp failed without a message")
            .to_string(),
    }
}
