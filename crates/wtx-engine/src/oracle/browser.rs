use super::{Oracle, OracleError};
use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashSet;
use wtx_common::FailureReason;

/// Flags HTTP responses by status code.
///
/// A non-empty allow list rejects every code outside it; the deny list
/// rejects its codes whether or not an allow list is configured.
#[derive(Debug, Clone, Default)]
pub struct HttpStatusOracle {
    allowed: HashSet<u16>,
    disallowed: HashSet<u16>,
}

impl HttpStatusOracle {
    pub fn new(
        allowed: impl IntoIterator<Item = u16>,
        disallowed: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            disallowed: disallowed.into_iter().collect(),
        }
    }

    pub fn failures_for(&self, status: u16, uri: &str) -> Vec<FailureReason> {
        let mut failures = Vec::new();
        if !self.allowed.is_empty() && !self.allowed.contains(&status) {
            failures.push(FailureReason::new(
                self.name(),
                format!("HTTP {} for {} not allowed", status, uri),
            ));
        }
        if self.disallowed.contains(&status) {
            failures.push(FailureReason::new(
                self.name(),
                format!("HTTP {} for {} disallowed", status, uri),
            ));
        }
        failures
    }
}

#[async_trait]
impl Oracle for HttpStatusOracle {
    fn name(&self) -> &str {
        "http_status"
    }

    async fn reset(&mut self, session: &mut Session) -> Result<(), OracleError> {
        session.driver().take_http_responses().await?;
        Ok(())
    }

    async fn check(&mut self, session: &mut Session) -> Result<Vec<FailureReason>, OracleError> {
        let responses = session.driver().take_http_responses().await?;
        Ok(responses
            .iter()
            .flat_map(|r| self.failures_for(r.status, &r.uri))
            .collect())
    }
}

/// Reports uncaught script errors.
#[derive(Debug, Clone, Default)]
pub struct ScriptErrorOracle;

impl ScriptErrorOracle {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Oracle for ScriptErrorOracle {
    fn name(&self) -> &str {
        "script_error"
    }

    async fn reset(&mut self, session: &mut Session) -> Result<(), OracleError> {
        session.driver().take_script_errors().await?;
        Ok(())
    }

    async fn check(&mut self, session: &mut Session) -> Result<Vec<FailureReason>, OracleError> {
        let errors = session.driver().take_script_errors().await?;
        Ok(errors
            .into_iter()
            .map(|e| {
                FailureReason::new(
                    self.name(),
                    format!("{} line {}: {}", e.source, e.line, e.message),
                )
            })
            .collect())
    }
}
