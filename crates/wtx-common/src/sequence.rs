use crate::action::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of actions replayed from a fresh page load.
///
/// Extension never mutates in place: `extended` and `with_suffix` return a
/// new sequence so many frontier entries can share a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSequence {
    actions: Vec<Action>,
}

impl ActionSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Number of exploration steps; setup actions are not counted.
    pub fn length(&self) -> usize {
        self.actions.iter().filter(|a| !a.initial).count()
    }

    /// Number of actions including setup.
    pub fn total_len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn last_action(&self) -> Option<&Action> {
        self.actions.last()
    }

    pub fn extended(&self, action: Action) -> Self {
        let mut actions = Vec::with_capacity(self.actions.len() + 1);
        actions.extend_from_slice(&self.actions);
        actions.push(action);
        Self { actions }
    }

    pub fn with_suffix(&self, suffix: &ActionSequence) -> Self {
        let mut actions = Vec::with_capacity(self.actions.len() + suffix.actions.len());
        actions.extend_from_slice(&self.actions);
        actions.extend_from_slice(&suffix.actions);
        Self { actions }
    }

    /// Every action flagged as a setup step.
    pub fn as_initial(&self) -> Self {
        Self {
            actions: self.actions.iter().map(Action::as_initial).collect(),
        }
    }

    pub fn occurrences(&self, action: &Action) -> usize {
        self.actions.iter().filter(|a| *a == action).count()
    }
}

impl From<Vec<Action>> for ActionSequence {
    fn from(actions: Vec<Action>) -> Self {
        Self::from_actions(actions)
    }
}

impl<'a> IntoIterator for &'a ActionSequence {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl fmt::Display for ActionSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", action)?;
        }
        write!(f, "]")
    }
}
