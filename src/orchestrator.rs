use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::download;
use crate::error::{Error, Result};
use crate::options::build_fetch_options;
use crate::prompt::collect_inputs;

/// Where a run currently is. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    CollectingInput,
    BuildingRequest,
    Fetching,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Drives one download from prompts to finished file.
pub struct Orchestrator {
    config: Config,
    stage: Stage,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Collect input, build the request and fetch it once.
    pub async fn run<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<PathBuf> {
        match self.attempt(input, output).await {
            Ok(path) => {
                self.advance(Stage::Done);
                info!("Download completed successfully: {}", path.display());
                Ok(path)
            }
            Err(e) => {
                self.advance(Stage::Failed);
                error!("Download failed: {}", e);
                Err(e)
            }
        }
    }

    async fn attempt<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> Result<PathBuf> {
        self.advance(Stage::CollectingInput);
        let request = collect_inputs(&self.config, input, output)?;

        self.advance(Stage::BuildingRequest);
        debug!(
            "Request: {}",
            serde_json::to_string(&request).unwrap_or_default()
        );
        let options = build_fetch_options(request, &self.config);

        self.advance(Stage::Fetching);
        // Partial files are left behind on interrupt.
        tokio::select! {
            result = download::execute(options) => result,
            Ok(()) = tokio::signal::ctrl_c() => Err(Error::Interrupted),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!("{} -> {}", self.stage, next);
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn empty_url_fails_before_fetching() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: tmp.path().join("out"),
            yt_dlp: tmp.path().join("never-run"),
            ..Config::default()
        };
        let mut orchestrator = Orchestrator::new(config);
        assert_eq!(orchestrator.stage(), Stage::Idle);

        let mut input = Cursor::new(b"\nvideo\n720\n".to_vec());
        let err = orchestrator.run(&mut input, &mut Vec::new()).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(orchestrator.stage(), Stage::Failed);
        // no fetch, so nothing was created
        assert!(!tmp.path().join("out").exists());
    }

    #[tokio::test]
    async fn fetch_failure_ends_in_failed_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: tmp.path().join("out"),
            yt_dlp: tmp.path().join("missing-yt-dlp"),
            ..Config::default()
        };
        let mut orchestrator = Orchestrator::new(config);

        let mut input = Cursor::new(b"https://example.com/watch?v=abc\nvideo\n480\n".to_vec());
        let err = orchestrator.run(&mut input, &mut Vec::new()).await.unwrap_err();

        assert_eq!(err.exit_code(), 7);
        assert_eq!(orchestrator.stage(), Stage::Failed);
    }
}
