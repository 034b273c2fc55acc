use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use thiserror::Error;
use wtx_common::{Action, State};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Failed to access state graph file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize state graph: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub action: Action,
    pub target: usize,
}

/// A distinct application state: what was observed plus what could be done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    pub id: usize,
    pub states: Vec<State>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl StateNode {
    fn matches(&self, states: &[State], actions: &[Action]) -> bool {
        self.actions.len() == actions.len()
            && self.actions.iter().all(|a| actions.contains(a))
            && self.states.len() == states.len()
            && self.states.iter().zip(states).all(|(a, b)| a == b)
    }
}

fn node_key(states: &[State]) -> String {
    states
        .iter()
        .map(State::canonical_key)
        .collect::<Vec<_>>()
        .join("|")
}

/// States discovered so far and the actions linking them.
///
/// Lookup goes through a hash of each node's canonical state key; nodes in
/// the same bucket are then compared with `State::diff`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateGraph {
    nodes: Vec<StateNode>,
    #[serde(skip)]
    index: HashMap<String, Vec<usize>>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&StateNode> {
        self.nodes.first()
    }

    pub fn node(&self, id: usize) -> Option<&StateNode> {
        self.nodes.get(id)
    }

    pub fn find(&self, states: &[State], actions: &[Action]) -> Option<usize> {
        self.index
            .get(&node_key(states))?
            .iter()
            .copied()
            .find(|id| self.nodes[*id].matches(states, actions))
    }

    /// Any node whose states equal `states`, regardless of its actions.
    pub fn find_by_states(&self, states: &[State]) -> Option<usize> {
        self.index.get(&node_key(states))?.iter().copied().find(|id| {
            let node = &self.nodes[*id];
            node.states.len() == states.len()
                && node.states.iter().zip(states).all(|(a, b)| a == b)
        })
    }

    /// Returns the node for this state, adding it when new. The flag is true for new nodes.
    pub fn insert(&mut self, states: Vec<State>, actions: Vec<Action>) -> (usize, bool) {
        if let Some(id) = self.find(&states, &actions) {
            return (id, false);
        }
        let id = self.nodes.len();
        self.index.entry(node_key(&states)).or_default().push(id);
        self.nodes.push(StateNode {
            id,
            states,
            actions,
            edges: Vec::new(),
        });
        (id, true)
    }

    pub fn add_edge(&mut self, from: usize, action: Action, to: usize) {
        if let Some(node) = self.nodes.get_mut(from) {
            let edge = Edge { action, target: to };
            if !node.edges.contains(&edge) {
                node.edges.push(edge);
            }
        }
    }

    /// Node ids reachable from `start`, breadth first.
    pub fn reachable_from(&self, start: usize) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut work = VecDeque::from([start]);
        while let Some(id) = work.pop_front() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            work.extend(node.edges.iter().map(|e| e.target));
        }
        order
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for node in &self.nodes {
            self.index
                .entry(node_key(&node.states))
                .or_default()
                .push(node.id);
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), GraphError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, GraphError> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut graph: StateGraph = serde_json::from_str(&content)?;
        graph.rebuild_index();
        Ok(graph)
    }
}
