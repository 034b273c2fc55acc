use super::{Oracle, OracleError};
use crate::session::Session;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use wtx_common::FailureReason;

/// Fails when more than `deadline` elapsed since the last reset.
#[derive(Debug, Clone)]
pub struct TimingOracle {
    deadline: Duration,
    started: Instant,
}

impl TimingOracle {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            started: Instant::now(),
        }
    }
}

#[async_trait]
impl Oracle for TimingOracle {
    fn name(&self) -> &str {
        "timing"
    }

    async fn reset(&mut self, _session: &mut Session) -> Result<(), OracleError> {
        self.started = Instant::now();
        Ok(())
    }

    async fn check(&mut self, _session: &mut Session) -> Result<Vec<FailureReason>, OracleError> {
        if self.started.elapsed() > self.deadline {
            Ok(vec![FailureReason::new(
                self.name(),
                format!("Deadline of {}millis exceeded", self.deadline.as_millis()),
            )])
        } else {
            Ok(Vec::new())
        }
    }
}
