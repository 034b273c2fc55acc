use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;
use wtx_common::ActionSequence;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to access frontier file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize frontier: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unsupported frontier format version {0}")]
    Version(u32),
}

/// A static slice of the seed frontier handled by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Zero-based index of the slice to keep.
    pub number: usize,
    /// Number of slices; zero disables partitioning.
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
struct PersistedFrontier {
    version: u32,
    /// In pop order.
    sequences: Vec<ActionSequence>,
}

/// Sequences waiting to be explored, used as a LIFO stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    sequences: VecDeque<ActionSequence>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sequence: ActionSequence) {
        self.sequences.push_front(sequence);
    }

    pub fn pop(&mut self) -> Option<ActionSequence> {
        self.sequences.pop_front()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Iterates in pop order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionSequence> {
        self.sequences.iter()
    }

    /// Stable sort; the smallest key pops first.
    pub fn sort_by_key<K: Ord>(&mut self, f: impl FnMut(&ActionSequence) -> K) {
        self.sequences.make_contiguous().sort_by_key(f);
    }

    /// Keeps only the `number`th of `count` contiguous chunks, in pop order.
    /// Chunks hold `ceil(len / count)` sequences; the last may be shorter or empty.
    pub fn partition(&mut self, partition: Partition) {
        if partition.count == 0 {
            return;
        }
        let chunk = self.sequences.len().div_ceil(partition.count);
        let start = (partition.number * chunk).min(self.sequences.len());
        let end = (start + chunk).min(self.sequences.len());
        self.sequences = self.sequences.drain(start..end).collect();
    }

    pub fn to_json(&self) -> Result<String, QueueError> {
        let persisted = PersistedFrontier {
            version: FORMAT_VERSION,
            sequences: self.sequences.iter().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&persisted)?)
    }

    pub fn from_json(json: &str) -> Result<Self, QueueError> {
        let persisted: PersistedFrontier = serde_json::from_str(json)?;
        if persisted.version != FORMAT_VERSION {
            return Err(QueueError::Version(persisted.version));
        }
        Ok(Self {
            sequences: persisted.sequences.into(),
        })
    }

    /// Writes the frontier to `path`, replacing the previous checkpoint atomically.
    pub async fn save(&self, path: &Path) -> Result<(), QueueError> {
        let json = self.to_json()?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, QueueError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wtx_common::Action;

    fn numbered(n: usize) -> ActionSequence {
        ActionSequence::from_actions(vec![Action::wait(n as u64)])
    }

    fn wait_of(sequence: &ActionSequence) -> u64 {
        match sequence.last_action().map(|a| &a.kind) {
            Some(wtx_common::ActionKind::Wait { duration_ms }) => *duration_ms,
            _ => panic!("expected wait"),
        }
    }

    #[test]
    fn behaves_as_a_stack() {
        let mut frontier = Frontier::new();
        frontier.push(numbered(1));
        frontier.push(numbered(2));
        frontier.push(numbered(3));
        assert_eq!(frontier.len(), 3);
        assert_eq!(wait_of(&frontier.pop().unwrap()), 3);
        assert_eq!(wait_of(&frontier.pop().unwrap()), 2);
        assert_eq!(wait_of(&frontier.pop().unwrap()), 1);
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn partitions_are_disjoint_and_cover_everything() {
        let mut seeds = Frontier::new();
        for n in 0..10 {
            seeds.push(numbered(n));
        }

        let mut covered = Vec::new();
        for number in 0..3 {
            let mut slice = seeds.clone();
            slice.partition(Partition { number, count: 3 });
            assert!(slice.len() <= 4);
            covered.extend(slice.iter().map(wait_of));
        }
        let all: Vec<u64> = seeds.iter().map(wait_of).collect();
        assert_eq!(covered, all);
    }

    #[test]
    fn zero_partitions_keeps_everything() {
        let mut frontier = Frontier::new();
        frontier.push(numbered(1));
        frontier.push(numbered(2));
        frontier.partition(Partition { number: 0, count: 0 });
        assert_eq!(frontier.len(), 2);
    }

    #[tokio::test]
    async fn persisted_frontier_pops_in_the_same_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let mut frontier = Frontier::new();
        for n in 0..5 {
            frontier.push(numbered(n));
        }
        frontier.save(&path).await.unwrap();

        let mut loaded = Frontier::load(&path).await.unwrap();
        assert_eq!(loaded, frontier);
        let popped: Vec<u64> = std::iter::from_fn(|| loaded.pop())
            .map(|s| wait_of(&s))
            .collect();
        assert_eq!(popped, vec![4, 3, 2, 1, 0]);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn rejects_unknown_versions() {
        let json = r#"{"version": 99, "sequences": []}"#;
        assert!(matches!(
            Frontier::from_json(json),
            Err(QueueError::Version(99))
        ));
    }
}
