use crate::driver::{DriverError, ElementHandle};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use wtx_common::Selector;

/// A named group of elements that behave the same, such as a column of
/// identical "favorite" toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceSet {
    pub name: String,
    pub selector: Selector,
}

impl EquivalenceSet {
    pub fn new(name: impl Into<String>, selector: Selector) -> Self {
        Self {
            name: name.into(),
            selector,
        }
    }
}

/// Membership of every equivalence set on the current page, for one round of
/// action enumeration. Each set may contribute actions through one element only.
#[derive(Debug, Default)]
pub struct EquivalenceRound {
    members: Vec<(String, HashSet<ElementHandle>)>,
    consumed: HashSet<String>,
}

impl EquivalenceRound {
    /// Evaluates every set's selector against the live page.
    pub async fn evaluate(
        sets: &[EquivalenceSet],
        session: &mut Session,
    ) -> Result<Self, DriverError> {
        let mut members = Vec::with_capacity(sets.len());
        for set in sets {
            let handles = session
                .select(&set.selector)
                .await?
                .into_iter()
                .map(|e| e.handle)
                .collect();
            members.push((set.name.clone(), handles));
        }
        Ok(Self {
            members,
            consumed: HashSet::new(),
        })
    }

    fn containing<'a>(&'a self, handle: &'a ElementHandle) -> impl Iterator<Item = &'a str> + 'a {
        self.members
            .iter()
            .filter(move |(_, handles)| handles.contains(handle))
            .map(|(name, _)| name.as_str())
    }

    /// True when the element belongs to a set that already contributed this round.
    pub fn should_skip(&self, handle: &ElementHandle) -> bool {
        self.containing(handle)
            .any(|name| self.consumed.contains(name))
    }

    /// Records that `handle` produced actions, consuming every set it belongs to.
    pub fn consume(&mut self, handle: &ElementHandle) {
        let names: Vec<String> = self.containing(handle).map(str::to_string).collect();
        self.consumed.extend(names);
    }

    pub fn consumed(&self) -> impl Iterator<Item = &str> {
        self.consumed.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(sets: Vec<(&str, Vec<&str>)>) -> EquivalenceRound {
        EquivalenceRound {
            members: sets
                .into_iter()
                .map(|(name, ids)| {
                    (
                        name.to_string(),
                        ids.into_iter().map(ElementHandle::new).collect(),
                    )
                })
                .collect(),
            consumed: HashSet::new(),
        }
    }

    #[test]
    fn one_representative_per_set() {
        let mut round = round(vec![("stars", vec!["s1", "s2", "s3"])]);
        let outsider = ElementHandle::new("other");

        assert!(!round.should_skip(&ElementHandle::new("s2")));
        round.consume(&ElementHandle::new("s2"));
        assert!(round.should_skip(&ElementHandle::new("s1")));
        assert!(round.should_skip(&ElementHandle::new("s3")));

        assert!(!round.should_skip(&outsider));
        round.consume(&outsider);
        assert_eq!(round.consumed().count(), 1);
    }

    #[test]
    fn overlapping_sets_are_consumed_together() {
        let mut round = round(vec![("a", vec!["x", "y"]), ("b", vec!["y", "z"])]);
        round.consume(&ElementHandle::new("y"));
        assert!(round.should_skip(&ElementHandle::new("x")));
        assert!(round.should_skip(&ElementHandle::new("z")));
    }
}
