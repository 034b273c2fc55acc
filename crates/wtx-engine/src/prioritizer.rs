use crate::queue::Frontier;

/// Reorders the whole frontier after each round of extensions.
pub trait SequencePrioritizer: Send + Sync {
    fn prioritize(&self, frontier: &mut Frontier);
}

/// Moves the shortest sequences to the pop end. The sort is stable, so
/// sequences of equal length keep their depth-first order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestFirst;

impl SequencePrioritizer for ShortestFirst {
    fn prioritize(&self, frontier: &mut Frontier) {
        frontier.sort_by_key(|s| s.length());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wtx_common::{Action, ActionSequence};

    #[test]
    fn shortest_pops_first() {
        let mut frontier = Frontier::new();
        frontier.push(ActionSequence::from_actions(vec![Action::back()]));
        frontier.push(ActionSequence::from_actions(vec![
            Action::back(),
            Action::forward(),
            Action::refresh(),
        ]));
        frontier.push(ActionSequence::from_actions(vec![Action::refresh(), Action::back()]));
        frontier.push(ActionSequence::from_actions(vec![Action::forward()]));

        ShortestFirst.prioritize(&mut frontier);

        let lengths: Vec<usize> = std::iter::from_fn(|| frontier.pop())
            .map(|s| s.length())
            .collect();
        assert_eq!(lengths, vec![1, 1, 2, 3]);
    }

    #[test]
    fn equal_lengths_keep_lifo_order() {
        let mut frontier = Frontier::new();
        frontier.push(ActionSequence::from_actions(vec![Action::back()]));
        frontier.push(ActionSequence::from_actions(vec![Action::forward()]));

        ShortestFirst.prioritize(&mut frontier);

        assert_eq!(frontier.pop().unwrap().last_action(), Some(&Action::forward()));
    }
}
