use crate::queue::Frontier;
use std::collections::{HashMap, HashSet};
use wtx_common::{Action, ActionSequence};

/// Decides whether a candidate sequence is worth queueing.
pub trait SequenceFilter: Send + Sync {
    fn should_explore(&self, candidate: &ActionSequence, frontier: &Frontier) -> bool;
}

/// Rejects sequences in which any single action occurs more than `max` times.
#[derive(Debug, Clone)]
pub struct MaxRepeatedActionFilter {
    max: usize,
}

impl MaxRepeatedActionFilter {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl SequenceFilter for MaxRepeatedActionFilter {
    fn should_explore(&self, candidate: &ActionSequence, _frontier: &Frontier) -> bool {
        let mut counts: HashMap<&Action, usize> = HashMap::new();
        for action in candidate {
            let count = counts.entry(action).or_insert(0);
            *count += 1;
            if *count > self.max {
                return false;
            }
        }
        true
    }
}

/// Rejects reorderings of already queued sequences.
///
/// A candidate is redundant when a queued sequence holds the same multiset
/// of actions and both agree position by position once every
/// order-insensitive action is replaced by a placeholder.
#[derive(Debug, Clone, Default)]
pub struct OrderInsensitiveFilter {
    actions: HashSet<Action>,
}

impl OrderInsensitiveFilter {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }

    fn normalized<'a>(&self, sequence: &'a ActionSequence) -> Vec<Option<&'a Action>> {
        sequence
            .iter()
            .map(|a| (!self.actions.contains(a)).then_some(a))
            .collect()
    }

    fn multiset(sequence: &ActionSequence) -> Vec<&Action> {
        let mut actions: Vec<&Action> = sequence.iter().collect();
        actions.sort();
        actions
    }
}

impl SequenceFilter for OrderInsensitiveFilter {
    fn should_explore(&self, candidate: &ActionSequence, frontier: &Frontier) -> bool {
        let shape = self.normalized(candidate);
        let contents = Self::multiset(candidate);
        !frontier.iter().any(|existing| {
            existing.total_len() == candidate.total_len()
                && self.normalized(existing) == shape
                && Self::multiset(existing) == contents
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wtx_common::ElementIdentifier;

    fn text(value: &str) -> Action {
        Action::set_text(ElementIdentifier::id("field"), value)
    }

    #[test]
    fn max_repeated_allows_up_to_the_limit() {
        let filter = MaxRepeatedActionFilter::new(2);
        let frontier = Frontier::new();
        let x = Action::click(ElementIdentifier::id("x"));

        let twice = ActionSequence::from_actions(vec![x.clone(), Action::back(), x.clone()]);
        assert!(filter.should_explore(&twice, &frontier));

        let thrice = twice.extended(x);
        assert!(!filter.should_explore(&thrice, &frontier));
    }

    #[test]
    fn order_insensitive_rejects_pure_reordering() {
        let filter = OrderInsensitiveFilter::new([text("bar"), text("foo")]);
        let mut frontier = Frontier::new();
        frontier.push(ActionSequence::from_actions(vec![
            Action::back(),
            text("bar"),
            text("foo"),
            Action::forward(),
        ]));

        let reordered = ActionSequence::from_actions(vec![
            Action::back(),
            text("foo"),
            text("bar"),
            Action::forward(),
        ]);
        assert!(!filter.should_explore(&reordered, &frontier));

        let repeated = ActionSequence::from_actions(vec![
            Action::back(),
            text("foo"),
            text("foo"),
            Action::forward(),
        ]);
        assert!(filter.should_explore(&repeated, &frontier));
    }

    #[test]
    fn order_sensitive_actions_keep_their_positions() {
        let filter = OrderInsensitiveFilter::new([text("bar"), text("foo")]);
        let mut frontier = Frontier::new();
        frontier.push(ActionSequence::from_actions(vec![
            Action::back(),
            text("bar"),
            Action::forward(),
            text("foo"),
        ]));
        let moved = ActionSequence::from_actions(vec![
            Action::back(),
            text("foo"),
            text("bar"),
            Action::forward(),
        ]);
        assert!(filter.should_explore(&moved, &frontier));
    }
}
