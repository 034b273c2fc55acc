use super::{TestCase, TestCaseError};
use crate::runner::RunResult;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

/// Persists emitted test cases.
#[async_trait]
pub trait TestCaseWriter: Send + Sync {
    /// `result` is the run the case was built from.
    async fn write(&mut self, case: &TestCase, result: &RunResult) -> Result<(), TestCaseError>;
}

/// Writes `<name>.json` files that `Replayer` can load.
pub struct ReplayableWriter {
    dir: PathBuf,
}

impl ReplayableWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TestCaseWriter for ReplayableWriter {
    async fn write(&mut self, case: &TestCase, _result: &RunResult) -> Result<(), TestCaseError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.json", case.name));
        tokio::fs::write(&path, serde_json::to_string_pretty(case)?).await?;
        info!("Wrote test case {}", path.display());
        Ok(())
    }
}

/// Writes `<name>.txt` files with numbered, human readable steps.
pub struct PrettyWriter {
    dir: PathBuf,
}

impl PrettyWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn render(case: &TestCase) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Test case {}", case.name);
        let _ = writeln!(out, "Start at {}", case.url);
        let _ = writeln!(out);
        for (i, action) in case.sequence.iter().enumerate() {
            let setup = if action.initial { " (setup)" } else { "" };
            let _ = writeln!(out, "{}. {}{}", i + 1, action, setup);
        }
        let _ = writeln!(out);
        if case.passed() {
            let _ = writeln!(out, "PASSED");
        } else {
            let _ = writeln!(out, "FAILED");
            for failure in &case.failures {
                let _ = writeln!(out, "  - {}", failure);
            }
        }
        out
    }
}

#[async_trait]
impl TestCaseWriter for PrettyWriter {
    async fn write(&mut self, case: &TestCase, _result: &RunResult) -> Result<(), TestCaseError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.txt", case.name));
        tokio::fs::write(&path, Self::render(case)).await?;
        Ok(())
    }
}

/// Writes the run's screenshots as `screenshots-<name>/<n>.png`, numbered
/// from 1 in action order.
pub struct ScreenshotWriter {
    dir: PathBuf,
}

impl ScreenshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TestCaseWriter for ScreenshotWriter {
    async fn write(&mut self, case: &TestCase, result: &RunResult) -> Result<(), TestCaseError> {
        if result.screenshots.is_empty() {
            return Err(TestCaseError::MissingScreenshots(case.name.clone()));
        }
        let dir = self.dir.join(format!("screenshots-{}", case.name));
        tokio::fs::create_dir_all(&dir).await?;
        for (i, png) in result.screenshots.iter().enumerate() {
            tokio::fs::write(dir.join(format!("{}.png", i + 1)), png).await?;
        }
        info!(
            "Wrote {} screenshots to {}",
            result.screenshots.len(),
            dir.display()
        );
        Ok(())
    }
}

/// Fans test cases out to every writer.
#[derive(Default)]
pub struct TestCaseSink {
    writers: Vec<Box<dyn TestCaseWriter>>,
    failures_only: bool,
}

impl TestCaseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_writer(mut self, writer: Box<dyn TestCaseWriter>) -> Self {
        self.writers.push(writer);
        self
    }

    /// Only keep cases with at least one failure.
    pub fn failures_only(mut self, enabled: bool) -> Self {
        self.failures_only = enabled;
        self
    }

    /// Returns whether the case was handed to the writers.
    pub async fn emit(&mut self, case: &TestCase, result: &RunResult) -> Result<bool, TestCaseError> {
        if self.failures_only && case.passed() {
            return Ok(false);
        }
        for writer in self.writers.iter_mut() {
            writer.write(case, result).await?;
        }
        Ok(true)
    }
}
