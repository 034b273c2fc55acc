mod browser;
mod final_state;
mod server_log;
mod timing;

pub use browser::{HttpStatusOracle, ScriptErrorOracle};
pub use final_state::FinalStateCheckOracle;
pub use server_log::{LogRecord, ServerLogOracle};
pub use timing::TimingOracle;

use crate::driver::DriverError;
use crate::session::Session;
use async_trait::async_trait;
use thiserror::Error;
use wtx_common::FailureReason;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("Server log request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Detects application failures without affecting control flow.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    /// Forget anything observed so far.
    async fn reset(&mut self, session: &mut Session) -> Result<(), OracleError>;

    /// Failures observed since the last reset.
    async fn check(&mut self, session: &mut Session) -> Result<Vec<FailureReason>, OracleError>;
}

/// Oracles for one run: `after_action` ones are reset before and checked
/// after every action, `final_checks` are reset when the page loads and
/// checked once after the last action.
#[derive(Default)]
pub struct OracleSet {
    pub after_action: Vec<Box<dyn Oracle>>,
    pub final_checks: Vec<Box<dyn Oracle>>,
}

impl OracleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_after_action(mut self, oracle: Box<dyn Oracle>) -> Self {
        self.after_action.push(oracle);
        self
    }

    pub fn with_final(mut self, oracle: Box<dyn Oracle>) -> Self {
        self.final_checks.push(oracle);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.after_action.is_empty() && self.final_checks.is_empty()
    }
}
