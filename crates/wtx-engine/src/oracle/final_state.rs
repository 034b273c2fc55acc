use super::{Oracle, OracleError};
use crate::checker::StateChecker;
use crate::session::Session;
use async_trait::async_trait;
use wtx_common::{FailureReason, State};

/// Compares the final page against the states a test case recorded.
pub struct FinalStateCheckOracle {
    expected: Vec<State>,
}

impl FinalStateCheckOracle {
    pub fn new(expected: Vec<State>) -> Self {
        Self { expected }
    }

    pub fn compare(actual: &State, expected: &State) -> Option<FailureReason> {
        let diffs = actual.diff(expected);
        if diffs.is_empty() {
            return None;
        }
        let mut message = format!("State check failed for state: {}", expected.kind());
        for diff in &diffs {
            message.push_str(&format!(
                "\n   actual -- {}, expected -- {}",
                diff.first().unwrap_or("null"),
                diff.second().unwrap_or("null")
            ));
        }
        Some(FailureReason::new("final_state", message))
    }
}

#[async_trait]
impl Oracle for FinalStateCheckOracle {
    fn name(&self) -> &str {
        "final_state"
    }

    async fn reset(&mut self, _session: &mut Session) -> Result<(), OracleError> {
        Ok(())
    }

    async fn check(&mut self, session: &mut Session) -> Result<Vec<FailureReason>, OracleError> {
        let mut failures = Vec::new();
        for expected in &self.expected {
            let actual = StateChecker::for_state(expected).snapshot(session).await?;
            failures.extend(Self::compare(&actual, expected));
        }
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_each_difference_on_its_own_line() {
        let failure = FinalStateCheckOracle::compare(
            &State::CountOfElements { count: 7 },
            &State::CountOfElements { count: 5 },
        )
        .unwrap();
        assert_eq!(
            failure.message,
            "State check failed for state: CountOfElements\n   actual -- 7, expected -- 5"
        );
        assert!(
            FinalStateCheckOracle::compare(
                &State::CountOfElements { count: 5 },
                &State::CountOfElements { count: 5 },
            )
            .is_none()
        );
    }
}
