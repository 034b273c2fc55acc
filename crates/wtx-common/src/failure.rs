use serde::{Deserialize, Serialize};
use std::fmt;

/// A problem detected by an oracle. Failures are data, not errors: they are
/// collected during a run and attached to its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Name of the oracle that reported the failure.
    pub source: String,
    pub message: String,
    /// Index of the action after which the failure was observed; `None` for final checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_action: Option<usize>,
}

impl FailureReason {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            after_action: None,
        }
    }

    pub fn at_action(mut self, index: usize) -> Self {
        self.after_action = Some(index);
        self
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
