use super::TestCase;
use crate::driver::DriverFactory;
use crate::oracle::{FinalStateCheckOracle, OracleSet};
use crate::registry::{FactoryRegistry, RegistryError};
use crate::runner::{NoObserver, RunResult, RunnerError, SequenceRunner, WaitSet};
use crate::wait::WaitSettings;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Re-runs recorded test cases and checks their final states.
pub struct Replayer<'a> {
    factory: Arc<dyn DriverFactory>,
    registry: &'a FactoryRegistry,
    num_retries: usize,
    wait: WaitSettings,
}

impl<'a> Replayer<'a> {
    pub fn new(factory: Arc<dyn DriverFactory>, registry: &'a FactoryRegistry) -> Self {
        Self {
            factory,
            registry,
            num_retries: crate::runner::DEFAULT_RETRIES,
            wait: WaitSettings::default(),
        }
    }

    pub fn with_retries(mut self, num_retries: usize) -> Self {
        self.num_retries = num_retries;
        self
    }

    pub fn with_wait_settings(mut self, wait: WaitSettings) -> Self {
        self.wait = wait;
        self
    }

    /// Builds the oracles and waits the case names, failing fast on unknown keys.
    pub fn prepare(&self, case: &TestCase) -> Result<(OracleSet, WaitSet), RegistryError> {
        let mut oracles = match &case.oracle_profile {
            Some(key) => self.registry.oracles(key)?,
            None => OracleSet::new(),
        };
        let waits = match &case.wait_profile {
            Some(key) => self.registry.waits(key)?,
            None => WaitSet::new(),
        };
        oracles
            .final_checks
            .push(Box::new(FinalStateCheckOracle::new(case.final_states.clone())));
        Ok((oracles, waits))
    }

    pub async fn replay(&self, case: &TestCase) -> Result<RunResult, ReplayError> {
        let (mut oracles, mut waits) = self.prepare(case)?;
        let runner = SequenceRunner::new(self.factory.clone(), Arc::new(case.selectors.clone()))
            .with_retries(self.num_retries)
            .with_wait_settings(self.wait);
        let result = runner
            .run(&case.url, &case.sequence, &mut oracles, &mut waits, &mut NoObserver)
            .await?;
        info!(
            "Replayed {}: {}",
            case.name,
            if result.passed() { "PASSED" } else { "FAILED" }
        );
        Ok(result)
    }
}
