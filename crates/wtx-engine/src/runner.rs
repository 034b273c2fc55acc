use crate::driver::{DriverError, DriverFactory};
use crate::oracle::{OracleError, OracleSet};
use crate::selector::SelectorRegistry;
use crate::session::Session;
use crate::wait::{WaitCondition, WaitSettings, wait_on_conditions};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use wtx_common::{Action, ActionSequence, FailureReason};

pub const DEFAULT_RETRIES: usize = 3;

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Sequence failed after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: usize, last: AttemptError },
}

/// Wait conditions for one run.
#[derive(Default)]
pub struct WaitSet {
    /// Applied once after the start page loads.
    pub initial: Vec<Box<dyn WaitCondition>>,
    /// Applied after every action.
    pub after_action: Vec<Box<dyn WaitCondition>>,
}

impl WaitSet {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of a sequence that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub failures: Vec<FailureReason>,
    /// Attempt that succeeded, starting at 1.
    pub attempt: usize,
    /// PNG captures taken after each action, when enabled.
    pub screenshots: Vec<Vec<u8>>,
}

impl RunResult {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Hooks into a run. Every attempt starts with `attempt_started`, so
/// observers can drop anything gathered during a failed attempt.
#[async_trait]
pub trait RunObserver: Send {
    async fn attempt_started(&mut self, _attempt: usize) {}

    /// Called before each action, after after-action oracles were reset.
    async fn before_action(
        &mut self,
        _session: &mut Session,
        _index: usize,
        _action: &Action,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    /// Called after the final oracles, while the session is still open.
    async fn after_sequence(&mut self, _session: &mut Session) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Observer that does nothing.
pub struct NoObserver;

impl RunObserver for NoObserver {}

/// Executes action sequences against fresh browser sessions.
pub struct SequenceRunner {
    factory: Arc<dyn DriverFactory>,
    selectors: Arc<SelectorRegistry>,
    num_retries: usize,
    wait: WaitSettings,
    screenshots: bool,
}

struct Attempt {
    failures: Vec<FailureReason>,
    screenshots: Vec<Vec<u8>>,
}

impl SequenceRunner {
    pub fn new(factory: Arc<dyn DriverFactory>, selectors: Arc<SelectorRegistry>) -> Self {
        Self {
            factory,
            selectors,
            num_retries: DEFAULT_RETRIES,
            wait: WaitSettings::default(),
            screenshots: false,
        }
    }

    pub fn with_retries(mut self, num_retries: usize) -> Self {
        self.num_retries = num_retries.max(1);
        self
    }

    pub fn with_wait_settings(mut self, wait: WaitSettings) -> Self {
        self.wait = wait;
        self
    }

    /// Capture the viewport after every action.
    pub fn with_screenshots(mut self, enabled: bool) -> Self {
        self.screenshots = enabled;
        self
    }

    pub fn selectors(&self) -> &Arc<SelectorRegistry> {
        &self.selectors
    }

    /// Runs `sequence` from `url`, retrying from scratch on errors.
    ///
    /// Oracle failures are collected into the result. Only exhausting every
    /// attempt is an error.
    pub async fn run(
        &self,
        url: &str,
        sequence: &ActionSequence,
        oracles: &mut OracleSet,
        waits: &mut WaitSet,
        observer: &mut dyn RunObserver,
    ) -> Result<RunResult, RunnerError> {
        let mut last = None;
        for attempt in 1..=self.num_retries {
            observer.attempt_started(attempt).await;
            match self.attempt(url, sequence, oracles, waits, observer).await {
                Ok(done) => {
                    return Ok(RunResult {
                        failures: done.failures,
                        attempt,
                        screenshots: done.screenshots,
                    });
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} of {} failed: {}",
                        attempt, self.num_retries, sequence, e
                    );
                    last = Some(e);
                }
            }
        }
        Err(RunnerError::RetriesExhausted {
            attempts: self.num_retries,
            last: last.unwrap_or(AttemptError::Driver(DriverError::NotReady)),
        })
    }

    async fn attempt(
        &self,
        url: &str,
        sequence: &ActionSequence,
        oracles: &mut OracleSet,
        waits: &mut WaitSet,
        observer: &mut dyn RunObserver,
    ) -> Result<Attempt, AttemptError> {
        let mut session = Session::open(self.factory.as_ref(), self.selectors.clone()).await?;
        let outcome = self
            .execute(&mut session, url, sequence, oracles, waits, observer)
            .await;
        if let Err(e) = session.close().await {
            warn!("Failed to close session: {}", e);
        }
        outcome
    }

    async fn execute(
        &self,
        session: &mut Session,
        url: &str,
        sequence: &ActionSequence,
        oracles: &mut OracleSet,
        waits: &mut WaitSet,
        observer: &mut dyn RunObserver,
    ) -> Result<Attempt, AttemptError> {
        let mut failures = Vec::new();
        let mut screenshots = Vec::new();

        session.load(url).await?;
        for oracle in oracles.final_checks.iter_mut() {
            oracle.reset(session).await?;
        }
        wait_on_conditions(session, &mut waits.initial, self.wait).await?;

        for (index, action) in sequence.iter().enumerate() {
            for oracle in oracles.after_action.iter_mut() {
                oracle.reset(session).await?;
            }
            observer.before_action(session, index, action).await?;

            debug!("Performing {}", action);
            session.perform(action).await?;
            session.invalidate_cache();

            wait_on_conditions(session, &mut waits.after_action, self.wait).await?;
            if self.screenshots {
                match session.driver().screenshot().await {
                    Ok(png) => screenshots.push(png),
                    Err(e) => warn!("No screenshot after {}: {}", action, e),
                }
            }
            for oracle in oracles.after_action.iter_mut() {
                let found = oracle.check(session).await?;
                failures.extend(found.into_iter().map(|f| f.at_action(index)));
            }
        }

        for oracle in oracles.final_checks.iter_mut() {
            failures.extend(oracle.check(session).await?);
        }
        observer.after_sequence(session).await?;
        Ok(Attempt {
            failures,
            screenshots,
        })
    }
}
