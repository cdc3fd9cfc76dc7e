use std::io::{BufRead, Write};

use crate::config::Config;
use crate::error::Result;
use crate::request::{normalize_url, DownloadRequest, MediaType, Quality};

/// Ask for URL, media type and quality, and build the request.
///
/// Blank answers take the defaults and unrecognized ones fall back to them.
/// Only an empty URL is an error. The quality question is skipped for audio.
pub fn collect_inputs<R: BufRead, W: Write>(
    config: &Config,
    input: &mut R,
    output: &mut W,
) -> Result<DownloadRequest> {
    let answer = ask(input, output, "Enter the video URL: ")?;
    // Fail before asking anything else.
    let url = normalize_url(&answer)?;

    let media_type = MediaType::parse_or_default(&ask(
        input,
        output,
        &format!(
            "Choose media type ({}) [{}]: ",
            MediaType::CHOICES,
            MediaType::default()
        ),
    )?);

    let quality = match media_type {
        MediaType::Video => Quality::parse_or_default(&ask(
            input,
            output,
            &format!(
                "Choose quality ({}) [{}]: ",
                Quality::CHOICES,
                Quality::default()
            ),
        )?),
        MediaType::Audio => Quality::default(),
    };

    DownloadRequest::new(url, media_type, quality, &config.output_dir)
}

/// Print a prompt and read one line. End of input reads as blank.
fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    fn run(answers: &str) -> (Result<DownloadRequest>, String) {
        let config = Config::default();
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = collect_inputs(&config, &mut input, &mut output);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn defaults_apply_to_blank_answers() {
        let (request, _) = run("https://example.com/watch?v=abc\n\n\n");
        let request = request.unwrap();
        assert_eq!(request.url(), "https://example.com/watch?v=abc");
        assert_eq!(request.media_type(), MediaType::Video);
        assert_eq!(request.quality(), Quality::Best);
        assert_eq!(request.output_directory(), Config::default().output_dir);
    }

    #[test]
    fn video_with_ceiling() {
        let (request, prompts) = run("https://example.com/v\nVIDEO\n480p\n");
        let request = request.unwrap();
        assert_eq!(request.quality(), Quality::P480);
        assert!(prompts.contains("Choose quality (best/worst/720/480/360) [best]: "));
    }

    #[test]
    fn audio_skips_quality_prompt() {
        let (request, prompts) = run("https://example.com/watch?v=abc\naudio\n720\n");
        let request = request.unwrap();
        assert_eq!(request.media_type(), MediaType::Audio);
        assert_eq!(request.quality(), Quality::Best);
        assert!(!prompts.contains("Choose quality"));
    }

    #[test]
    fn unrecognized_answers_fall_back() {
        let (request, _) = run("https://example.com/v\nslideshow\n1080\n");
        let request = request.unwrap();
        assert_eq!(request.media_type(), MediaType::Video);
        assert_eq!(request.quality(), Quality::Best);
    }

    #[test]
    fn empty_url_fails_without_further_prompts() {
        let (result, prompts) = run("\nvideo\n720\n");
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(prompts, "Enter the video URL: ");
    }

    #[test]
    fn closed_input_is_blank() {
        let (result, _) = run("");
        assert!(matches!(result, Err(Error::Validation(_))));

        let (request, _) = run("https://example.com/v");
        assert_eq!(request.unwrap().media_type(), MediaType::Video);
    }
}
