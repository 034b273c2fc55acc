use super::{Oracle, OracleError};
use crate::session::Session;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wtx_common::FailureReason;

/// One record served by the application's log endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub logger_name: String,
    #[serde(default)]
    pub millis: u64,
}

impl LogRecord {
    pub fn is_failure(&self) -> bool {
        matches!(self.level.to_uppercase().as_str(), "SEVERE" | "WARNING")
    }

    pub fn describe(&self) -> String {
        format!(
            "Log Message Failure: {}: {} from {} @{}",
            self.level, self.message, self.logger_name, self.millis
        )
    }
}

/// Scrapes server-side warnings from an HTTP log endpoint.
///
/// `reset` POSTs to `reset_url` to clear the server buffer; `check` GETs a
/// JSON array of `LogRecord`s from `fetch_url`.
pub struct ServerLogOracle {
    reset_url: String,
    fetch_url: String,
    client: reqwest::Client,
}

impl ServerLogOracle {
    pub fn new(reset_url: impl Into<String>, fetch_url: impl Into<String>) -> Self {
        Self {
            reset_url: reset_url.into(),
            fetch_url: fetch_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Oracle for ServerLogOracle {
    fn name(&self) -> &str {
        "server_log"
    }

    async fn reset(&mut self, _session: &mut Session) -> Result<(), OracleError> {
        self.client
            .post(&self.reset_url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn check(&mut self, _session: &mut Session) -> Result<Vec<FailureReason>, OracleError> {
        let records: Vec<LogRecord> = self
            .client
            .get(&self.fetch_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(records
            .iter()
            .filter(|r| r.is_failure())
            .map(|r| FailureReason::new(self.name(), r.describe()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_severe_and_warning_are_failures() {
        let json = r#"[
            {"level": "INFO", "message": "started", "loggerName": "app", "millis": 1},
            {"level": "WARNING", "message": "slow query", "loggerName": "db", "millis": 42},
            {"level": "SEVERE", "message": "boom", "loggerName": "web", "millis": 43}
        ]"#;
        let records: Vec<LogRecord> = serde_json::from_str(json).unwrap();
        let failures: Vec<String> = records
            .iter()
            .filter(|r| r.is_failure())
            .map(LogRecord::describe)
            .collect();
        assert_eq!(
            failures,
            vec![
                "Log Message Failure: WARNING: slow query from db @42",
                "Log Message Failure: SEVERE: boom from web @43",
            ]
        );
    }
}
