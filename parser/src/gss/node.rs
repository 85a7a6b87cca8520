//! The graph-structured stack: an arena of growing nodes with id-based
//! previous-links.
//!
//! Node identity is (state, start, next-input position, priority). Two
//! growing paths reaching the same identity merge into one node whose
//! previous-links accumulate, so work is bounded by the automaton's state
//! space times input positions, not by the number of derivations.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use espalier_runtime::TreeNodeId;

use crate::automaton::StateNumber;

pub type NodeId = usize;

/// Identity of a growing node in the GSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrowingNodeIndex {
    pub state: StateNumber,
    /// Input position where this node's span starts.
    pub start: usize,
    /// Next input position (end of the span matched so far).
    pub end: usize,
    /// Option of the rule position being grown; disambiguates derivations
    /// of the same rule through different alternatives.
    pub priority: u32,
}

/// One GSS node. Growing (interior) nodes accumulate children; completed
/// nodes carry the packed tree of their derivation.
#[derive(Debug, Clone)]
pub struct GrowingNode {
    pub index: GrowingNodeIndex,
    pub previous: BTreeSet<NodeId>,
    /// Children matched so far (growing nodes only).
    pub children: Vec<TreeNodeId>,
    /// Packed derivation tree (completed nodes and leaves).
    pub tree: Option<TreeNodeId>,
}

/// Arena plus identity map. Nodes are never removed; a node no head
/// depends on is simply garbage.
#[derive(Default)]
pub struct ParseGraph {
    nodes: Vec<GrowingNode>,
    ids: FxHashMap<GrowingNodeIndex, NodeId>,
}

/// Result of [`ParseGraph::merge`].
pub struct Merged {
    pub id: NodeId,
    pub created: bool,
    /// A previously-existing node gained at least one new previous-link
    /// and should be re-processed.
    pub grew_links: bool,
}

impl ParseGraph {
    pub fn new() -> Self {
        ParseGraph::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &GrowingNode {
        &self.nodes[id]
    }

    /// Create the node for `index` or merge into the existing one.
    /// Merging only accumulates previous-links; the first arrival's
    /// children/tree stand (derivation alternatives pack in the tree
    /// arena, not here).
    pub fn merge(
        &mut self,
        index: GrowingNodeIndex,
        previous: impl IntoIterator<Item = NodeId>,
        children: Vec<TreeNodeId>,
        tree: Option<TreeNodeId>,
    ) -> Merged {
        if let Some(&id) = self.ids.get(&index) {
            let node = &mut self.nodes[id];
            let mut grew_links = false;
            for p in previous {
                grew_links |= node.previous.insert(p);
            }
            Merged { id, created: false, grew_links }
        } else {
            let id = self.nodes.len();
            self.nodes.push(GrowingNode {
                index,
                previous: previous.into_iter().collect(),
                children,
                tree,
            });
            self.ids.insert(index, id);
            Merged { id, created: true, grew_links: false }
        }
    }
}
