use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::tree::Forest;

/// Monotonic token for one toggle → layout → measure → route cycle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const INITIAL: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Set of expanded node ids plus the generation counter that every mutation
/// advances. Only nodes with children can ever be members.
#[derive(Debug, Clone, Default)]
pub struct ExpansionState {
    expanded: BTreeSet<String>,
    expandable: BTreeSet<String>,
    generation: Generation,
}

impl ExpansionState {
    pub fn new(forest: &Forest) -> Self {
        Self {
            expanded: BTreeSet::new(),
            expandable: forest.expandable_ids(),
            generation: Generation::INITIAL,
        }
    }

    pub fn with_expanded<I, S>(forest: &Forest, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = Self::new(forest);
        for id in ids {
            let id: &str = id.as_ref();
            if state.expandable.contains(id) {
                state.expanded.insert(id.to_string());
            }
        }
        state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn is_expandable(&self, id: &str) -> bool {
        self.expandable.contains(id)
    }

    pub fn expanded(&self) -> &BTreeSet<String> {
        &self.expanded
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    /// Flips one node. Unknown ids and leaves are ignored and leave the
    /// generation untouched; returns whether anything changed.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.expandable.contains(id) {
            debug!(id, "toggle ignored for unknown or childless node");
            return false;
        }
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
        }
        self.bump("toggle");
        true
    }

    pub fn expand(&mut self, id: &str) -> bool {
        if !self.expandable.contains(id) || self.expanded.contains(id) {
            return false;
        }
        self.expanded.insert(id.to_string());
        self.bump("expand");
        true
    }

    pub fn collapse(&mut self, id: &str) -> bool {
        if !self.expanded.remove(id) {
            return false;
        }
        self.bump("collapse");
        true
    }

    pub fn expand_all(&mut self) -> Generation {
        self.expanded = self.expandable.clone();
        self.bump("expand-all")
    }

    pub fn collapse_all(&mut self) -> Generation {
        self.expanded.clear();
        self.bump("collapse-all")
    }

    /// Replaces the whole set; ids that cannot expand are dropped.
    pub fn set_expanded<I, S>(&mut self, ids: I) -> Generation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut expanded = BTreeSet::new();
        for id in ids {
            let id: &str = id.as_ref();
            if self.expandable.contains(id) {
                expanded.insert(id.to_string());
            }
        }
        self.expanded = expanded;
        self.bump("set-expanded")
    }

    fn bump(&mut self, reason: &str) -> Generation {
        self.generation = self.generation.next();
        debug!(
            generation = self.generation.value(),
            expanded = self.expanded.len(),
            reason,
            "expansion state changed"
        );
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, TreeNode};

    fn forest() -> Forest {
        Forest::new(vec![TreeNode::new("a", "A", NodeKind::Program).with_children(vec![
            TreeNode::new("b", "B", NodeKind::Program).with_children(vec![TreeNode::new(
                "x",
                "X",
                NodeKind::Product,
            )]),
            TreeNode::new("c", "C", NodeKind::Program),
        ])])
        .unwrap()
    }

    #[test]
    fn toggle_flips_and_bumps_generation() {
        let forest = forest();
        let mut state = ExpansionState::new(&forest);
        assert!(state.toggle("a"));
        assert!(state.is_expanded("a"));
        assert_eq!(state.generation(), Generation::new(1));
        assert!(state.toggle("a"));
        assert!(!state.is_expanded("a"));
        assert_eq!(state.generation(), Generation::new(2));
    }

    #[test]
    fn toggling_leaf_or_unknown_is_a_no_op() {
        let forest = forest();
        let mut state = ExpansionState::with_expanded(&forest, ["a"]);
        let before = state.expanded().clone();
        assert!(!state.toggle("c"));
        assert!(!state.toggle("missing"));
        assert_eq!(state.expanded(), &before);
        assert_eq!(state.generation(), Generation::INITIAL);
    }

    #[test]
    fn expand_all_reaches_every_depth_then_collapse_all_empties() {
        let forest = forest();
        let mut state = ExpansionState::new(&forest);
        let g1 = state.expand_all();
        assert!(state.is_expanded("a"));
        assert!(state.is_expanded("b"));
        assert!(!state.is_expanded("c"));
        let g2 = state.collapse_all();
        assert!(state.is_empty());
        assert!(g2 > g1);
    }

    #[test]
    fn set_expanded_drops_leaves() {
        let forest = forest();
        let mut state = ExpansionState::new(&forest);
        state.set_expanded(["a", "c", "nope"]);
        let ids: Vec<&str> = state.expanded().iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["a"]);
    }
}
