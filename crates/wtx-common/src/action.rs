use crate::identifier::ElementIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The interaction an `Action` performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Click {
        target: ElementIdentifier,
    },
    SetText {
        target: ElementIdentifier,
        value: String,
    },
    Select {
        target: ElementIdentifier,
        option_index: usize,
    },
    Hover {
        target: ElementIdentifier,
        delay_ms: u64,
    },
    Wait {
        duration_ms: u64,
    },
    Back,
    Forward,
    Refresh,
    Composite {
        actions: Vec<Action>,
    },
}

/// A single step of an action sequence.
///
/// `initial` marks setup steps (login, navigation to a starting screen) that
/// are replayed but never count towards a sequence's length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub initial: bool,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            initial: false,
        }
    }

    pub fn click(target: ElementIdentifier) -> Self {
        Self::new(ActionKind::Click { target })
    }

    pub fn set_text(target: ElementIdentifier, value: impl Into<String>) -> Self {
        Self::new(ActionKind::SetText {
            target,
            value: value.into(),
        })
    }

    pub fn select(target: ElementIdentifier, option_index: usize) -> Self {
        Self::new(ActionKind::Select {
            target,
            option_index,
        })
    }

    pub fn hover(target: ElementIdentifier, delay_ms: u64) -> Self {
        Self::new(ActionKind::Hover { target, delay_ms })
    }

    pub fn wait(duration_ms: u64) -> Self {
        Self::new(ActionKind::Wait { duration_ms })
    }

    pub fn back() -> Self {
        Self::new(ActionKind::Back)
    }

    pub fn forward() -> Self {
        Self::new(ActionKind::Forward)
    }

    pub fn refresh() -> Self {
        Self::new(ActionKind::Refresh)
    }

    pub fn composite(actions: Vec<Action>) -> Self {
        Self::new(ActionKind::Composite { actions })
    }

    /// Returns a copy flagged as a setup step. Composite children are flagged too.
    pub fn as_initial(&self) -> Self {
        let kind = match &self.kind {
            ActionKind::Composite { actions } => ActionKind::Composite {
                actions: actions.iter().map(Action::as_initial).collect(),
            },
            other => other.clone(),
        };
        Self {
            kind,
            initial: true,
        }
    }

    /// The element this action is bound to. Browser-chrome actions, waits and
    /// composites have none.
    pub fn target(&self) -> Option<&ElementIdentifier> {
        match &self.kind {
            ActionKind::Click { target }
            | ActionKind::SetText { target, .. }
            | ActionKind::Select { target, .. }
            | ActionKind::Hover { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_browser_action(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Back | ActionKind::Forward | ActionKind::Refresh
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Click { target } => write!(f, "Click {}", target),
            ActionKind::SetText { target, value } => {
                write!(f, "Set the text in {} to '{}'", target, value)
            }
            ActionKind::Select {
                target,
                option_index,
            } => write!(f, "Select option {} from {}", option_index, target),
            ActionKind::Hover { target, delay_ms } => {
                write!(f, "Hover over {} for {}ms", target, delay_ms)
            }
            ActionKind::Wait { duration_ms } => write!(f, "Wait {}ms", duration_ms),
            ActionKind::Back => write!(f, "Click the Back button"),
            ActionKind::Forward => write!(f, "Click the Forward button"),
            ActionKind::Refresh => write!(f, "Click the Refresh button"),
            ActionKind::Composite { actions } => {
                for (i, action) in actions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", then ")?;
                    }
                    write!(f, "{}", action)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_flag_participates_in_equality() {
        let click = Action::click(ElementIdentifier::id("go"));
        assert_ne!(click, click.as_initial());
        assert_eq!(click.as_initial(), click.as_initial());
    }

    #[test]
    fn composite_initial_marks_children() {
        let composite = Action::composite(vec![Action::back(), Action::wait(10)]).as_initial();
        let ActionKind::Composite { actions } = &composite.kind else {
            panic!("expected composite");
        };
        assert!(actions.iter().all(|a| a.initial));
    }

    #[test]
    fn describes_actions_for_humans() {
        let id = ElementIdentifier::name("q");
        assert_eq!(
            Action::set_text(id.clone(), "abc").to_string(),
            "Set the text in element named 'q' to 'abc'"
        );
        assert_eq!(
            Action::select(id, 1).to_string(),
            "Select option 1 from element named 'q'"
        );
        assert_eq!(Action::back().to_string(), "Click the Back button");
    }

    #[test]
    fn json_shape_is_flat() {
        let action = Action::select(ElementIdentifier::id("lang"), 1);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "select");
        assert_eq!(json["option_index"], 1);
        assert_eq!(json["target"]["id"], "lang");
        assert!(json.get("initial").is_none());

        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }
}
