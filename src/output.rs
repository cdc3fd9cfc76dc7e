use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Used when nothing survives sanitizing.
pub const FALLBACK_NAME: &str = "download";

const ILLEGAL: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
const MAX_NAME_BYTES: usize = 200;
const MAX_EXT_CHARS: usize = 16;
const RESERVED: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Make `name` safe to use as a file name on common filesystems.
///
/// Strips `\ / : * ? " < > |` and control characters, trims whitespace and
/// dots from both ends, caps the length and escapes Windows device names.
/// Never returns an empty string, and applying it twice changes nothing.
pub fn sanitize_filename(name: &str) -> String {
    sanitize_within(name, MAX_NAME_BYTES)
}

/// File name for a title and extension. The title is cut short enough that
/// the extension always survives, and the result is left unchanged by
/// [`sanitize_filename`].
pub fn output_filename(title: &str, ext: &str) -> String {
    let ext: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXT_CHARS)
        .collect();
    if ext.is_empty() {
        return sanitize_filename(title);
    }

    let stem = sanitize_within(title, MAX_NAME_BYTES - ext.len() - 1);
    format!("{}.{}", stem, ext)
}

fn sanitize_within(name: &str, limit: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL.contains(c) && !c.is_control())
        .collect();

    let mut result = trim_edges(&cleaned).to_string();
    cap_length(&mut result, limit);

    if result.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let stem = result.split('.').next().unwrap_or_default();
    if RESERVED.contains(&stem.to_ascii_lowercase().as_str()) {
        result.insert(0, '_');
        cap_length(&mut result, limit);
    }

    result
}

fn cap_length(name: &mut String, limit: usize) {
    if name.len() <= limit {
        return;
    }
    let mut end = limit;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name.truncate(end);
    *name = trim_edges(name).to_string();
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '.')
}

/// Make sure `directory` exists and return the path of `filename` inside it.
pub fn resolve_output_path(directory: &Path, filename: &str) -> Result<PathBuf> {
    ensure_directory(directory)?;
    Ok(directory.join(sanitize_filename(filename)))
}

/// Create `directory` and its parents if needed.
pub fn ensure_directory(directory: &Path) -> Result<()> {
    if directory.is_dir() {
        return Ok(());
    }
    if directory.exists() {
        return Err(Error::filesystem(
            directory,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "not a directory"),
        ));
    }

    debug!("Creating output directory {}", directory.display());
    std::fs::create_dir_all(directory).map_err(|e| Error::filesystem(directory, e))
}
