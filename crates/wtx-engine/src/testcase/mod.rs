mod replay;
mod writer;

pub use replay::{ReplayError, Replayer};
pub use writer::{PrettyWriter, ReplayableWriter, ScreenshotWriter, TestCaseSink, TestCaseWriter};

use crate::selector::SelectorRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use wtx_common::{ActionSequence, FailureReason, State};

#[derive(Debug, Error)]
pub enum TestCaseError {
    #[error("Failed to access test case file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize test case: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("No screenshots were captured for {0}; enable screenshot capture")]
    MissingScreenshots(String),
}

/// A discovered regression test, replayable without the explorer's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub url: String,
    pub sequence: ActionSequence,
    /// Expected states after the last action.
    pub final_states: Vec<State>,
    /// Key of the oracle factory the case was generated with.
    #[serde(default)]
    pub oracle_profile: Option<String>,
    /// Key of the wait-condition factory the case was generated with.
    #[serde(default)]
    pub wait_profile: Option<String>,
    #[serde(default)]
    pub selectors: SelectorRegistry,
    /// Failures observed when the case was generated.
    #[serde(default)]
    pub failures: Vec<FailureReason>,
}

impl TestCase {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub async fn load(path: &Path) -> Result<Self, TestCaseError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}
