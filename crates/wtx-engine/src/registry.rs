use crate::oracle::OracleSet;
use crate::runner::WaitSet;
use std::collections::HashMap;
use thiserror::Error;

pub type OracleFactory = Box<dyn Fn() -> OracleSet + Send + Sync>;
pub type WaitFactory = Box<dyn Fn() -> WaitSet + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No {kind} factory registered under '{key}'")]
    Unknown { kind: &'static str, key: String },
}

/// Constructors for oracle and wait-condition sets, looked up by key.
///
/// Test cases record the keys they were generated with so a replay can
/// rebuild fresh, equivalent instances.
#[derive(Default)]
pub struct FactoryRegistry {
    oracles: HashMap<String, OracleFactory>,
    waits: HashMap<String, WaitFactory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_oracles(
        &mut self,
        key: impl Into<String>,
        factory: impl Fn() -> OracleSet + Send + Sync + 'static,
    ) {
        self.oracles.insert(key.into(), Box::new(factory));
    }

    pub fn register_waits(
        &mut self,
        key: impl Into<String>,
        factory: impl Fn() -> WaitSet + Send + Sync + 'static,
    ) {
        self.waits.insert(key.into(), Box::new(factory));
    }

    pub fn has_oracles(&self, key: &str) -> bool {
        self.oracles.contains_key(key)
    }

    pub fn has_waits(&self, key: &str) -> bool {
        self.waits.contains_key(key)
    }

    pub fn oracles(&self, key: &str) -> Result<OracleSet, RegistryError> {
        self.oracles
            .get(key)
            .map(|f| f())
            .ok_or_else(|| RegistryError::Unknown {
                kind: "oracle",
                key: key.to_string(),
            })
    }

    pub fn waits(&self, key: &str) -> Result<WaitSet, RegistryError> {
        self.waits
            .get(key)
            .map(|f| f())
            .ok_or_else(|| RegistryError::Unknown {
                kind: "wait",
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptErrorOracle;

    #[test]
    fn builds_fresh_sets_by_key() {
        let mut registry = FactoryRegistry::new();
        registry.register_oracles("strict", || {
            OracleSet::new().with_after_action(Box::new(ScriptErrorOracle::new()))
        });

        let first = registry.oracles("strict").unwrap();
        let second = registry.oracles("strict").unwrap();
        assert_eq!(first.after_action.len(), 1);
        assert_eq!(second.after_action.len(), 1);

        assert_eq!(
            registry.waits("strict").err(),
            Some(RegistryError::Unknown {
                kind: "wait",
                key: "strict".into()
            })
        );
    }
}
