//! The discrimination tree (§3, §4.1): the DT stores all state-distinguishing
//! information as a binary tree of discriminators.
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`], per §9's
//! arena-with-indices guidance. A node is a tagged sum type ([`Node`]); a
//! leaf turning into an inner node (`split_leaf`) mutates the arena slot in
//! place so the handle stays valid for any transition that already targets
//! it (§9: "keep the handle stable").

use indexmap::IndexSet;
use tracing::trace;

use crate::cache::MembershipOracle;
use crate::error::{LearnerError, Result};
use crate::ids::{NodeId, StateId};
use crate::word::Word;

/// A discrimination tree node. `Leaf` carries the (possibly not yet
/// materialized) hypothesis state it represents; `Inner` carries the
/// discriminator and the two children reached on membership outcome
/// `false`/`true` respectively.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf {
        state: Option<StateId>,
    },
    Inner {
        discriminator: Word,
        left: NodeId,
        right: NodeId,
        is_temporary: bool,
    },
}

#[derive(Debug, Clone)]
struct NodeData {
    node: Node,
    parent: Option<NodeId>,
    /// Non-tree transitions `(state, symbol)` currently targeting this node.
    incoming_non_tree: IndexSet<(StateId, char)>,
}

/// The discrimination tree. The root is always an `Inner` node with
/// discriminator `""` (global invariant 6), enforced here rather than left
/// to convention (§9 Open Questions).
#[derive(Debug)]
pub struct DiscriminationTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl DiscriminationTree {
    /// Builds a fresh tree: root = `Inner("")` with two empty leaf children,
    /// matching §4.6's `initialize ... DT root = Inner("")`.
    pub fn new() -> Self {
        let mut nodes = Vec::new();
        // Placeholder root, patched below once children exist.
        nodes.push(NodeData {
            node: Node::Inner {
                discriminator: Word::empty(),
                left: NodeId(0),
                right: NodeId(0),
                is_temporary: false,
            },
            parent: None,
            incoming_non_tree: IndexSet::new(),
        });
        let root = NodeId(0);
        let left = Self::push_leaf(&mut nodes, Some(root));
        let right = Self::push_leaf(&mut nodes, Some(root));
        nodes[0].node = Node::Inner {
            discriminator: Word::empty(),
            left,
            right,
            is_temporary: false,
        };
        Self { nodes, root }
    }

    fn push_leaf(nodes: &mut Vec<NodeData>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(nodes.len());
        nodes.push(NodeData {
            node: Node::Leaf { state: None },
            parent,
            incoming_non_tree: IndexSet::new(),
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn incoming_non_tree(&self, id: NodeId) -> impl Iterator<Item = (StateId, char)> + '_ {
        self.nodes[id.index()].incoming_non_tree.iter().copied()
    }

    pub fn add_incoming_non_tree(&mut self, id: NodeId, state: StateId, symbol: char) {
        self.nodes[id.index()].incoming_non_tree.insert((state, symbol));
    }

    pub fn remove_incoming_non_tree(&mut self, id: NodeId, state: StateId, symbol: char) {
        self.nodes[id.index()]
            .incoming_non_tree
            .shift_remove(&(state, symbol));
    }

    /// The state associated with a leaf, if materialized. `None` if `id` is
    /// an inner node or an unmaterialized leaf.
    pub fn leaf_state(&self, id: NodeId) -> Option<StateId> {
        match self.node(id) {
            Node::Leaf { state } => *state,
            Node::Inner { .. } => None,
        }
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Leaf { .. })
    }

    /// Associates `state` with leaf `id`. Fails if `id` is not an
    /// unmaterialized leaf: relinking an already-materialized leaf is
    /// forbidden (§9 Open Questions: relink semantics are unclear in the
    /// source, so this implementation forbids it outright).
    pub fn materialize_leaf(&mut self, id: NodeId, state: StateId) -> Result<()> {
        match &mut self.nodes[id.index()].node {
            Node::Leaf { state: slot @ None } => {
                *slot = Some(state);
                Ok(())
            }
            Node::Leaf { state: Some(_) } => Err(LearnerError::invariant(
                "leaf-materialized-once",
                format!("leaf {id:?} is already materialized"),
            )),
            Node::Inner { .. } => Err(LearnerError::invariant(
                "materialize-leaf-only",
                format!("node {id:?} is not a leaf"),
            )),
        }
    }

    /// Descends from `start` following membership answers on `word ++
    /// node.discriminator`, returning the leaf reached (§4.1 `sift`). One
    /// membership query per tree level traversed.
    pub fn sift(
        &self,
        word: &Word,
        start: NodeId,
        oracle: &mut MembershipOracle<'_>,
    ) -> Result<NodeId> {
        let mut current = start;
        loop {
            match self.node(current) {
                Node::Leaf { .. } => return Ok(current),
                Node::Inner {
                    discriminator,
                    left,
                    right,
                    ..
                } => {
                    let query = word.concat(discriminator);
                    let answer = oracle.ask(&query)?;
                    trace!(?word, ?discriminator, answer, "sift step");
                    current = if answer { *right } else { *left };
                }
            }
        }
    }

    /// Splits leaf `id` into a temporary inner node labeled `discriminator`,
    /// with two fresh empty leaves as children. If the leaf already carries
    /// a state (`existing`, with its access sequence), that state is
    /// re-placed into whichever child matches
    /// `is_member(existing.aseq ++ discriminator)` (§4.1).
    ///
    /// Returns `(left, right)`, where `left` is reached on outcome `false`.
    pub fn split_leaf(
        &mut self,
        id: NodeId,
        discriminator: Word,
        existing: Option<(StateId, &Word)>,
        oracle: &mut MembershipOracle<'_>,
    ) -> Result<(NodeId, NodeId)> {
        if !self.is_leaf(id) {
            return Err(LearnerError::invariant(
                "split-leaf-only",
                format!("node {id:?} is not a leaf"),
            ));
        }
        let left = Self::push_leaf(&mut self.nodes, Some(id));
        let right = Self::push_leaf(&mut self.nodes, Some(id));

        if let Some((state, aseq)) = existing {
            let query = aseq.concat(&discriminator);
            let goes_right = oracle.ask(&query)?;
            let target = if goes_right { right } else { left };
            self.materialize_leaf(target, state)?;
        }

        self.nodes[id.index()].node = Node::Inner {
            discriminator,
            left,
            right,
            is_temporary: true,
        };
        Ok((left, right))
    }

    /// Lowest common ancestor of a non-empty set of nodes (§4.1 `lca`).
    pub fn lca(&self, nodes: &[NodeId]) -> NodeId {
        assert!(!nodes.is_empty(), "lca of empty node set");
        let mut common = self.ancestors_path(nodes[0]);
        for &n in &nodes[1..] {
            let path: IndexSet<NodeId> = self.ancestors_path(n).into_iter().collect();
            common.retain(|x| path.contains(x));
        }
        common[0]
    }

    fn ancestors_path(&self, mut n: NodeId) -> Vec<NodeId> {
        let mut path = vec![n];
        while let Some(p) = self.parent(n) {
            path.push(p);
            n = p;
        }
        path
    }

    /// Replaces a temporary inner node's discriminator with an equally
    /// distinguishing, shorter one and clears `is_temporary`. Children,
    /// parent and `incoming_non_tree` are left untouched — only the label
    /// changes, so every external `NodeId` stays valid (§4.5, §9).
    pub fn replace_with_final(&mut self, id: NodeId, new_discriminator: Word) -> Result<()> {
        match &mut self.nodes[id.index()].node {
            Node::Inner {
                discriminator,
                is_temporary,
                ..
            } => {
                trace!(node = ?id, old = ?discriminator, new = ?new_discriminator, "finalize discriminator");
                *discriminator = new_discriminator;
                *is_temporary = false;
                Ok(())
            }
            Node::Leaf { .. } => Err(LearnerError::invariant(
                "finalize-inner-only",
                format!("node {id:?} is not an inner node"),
            )),
        }
    }

    /// The signature of a leaf: `[(d1, b1), (d2, b2), ...]` walking
    /// parent-ward, closest ancestor first (§3).
    pub fn signature(&self, leaf: NodeId) -> Vec<(Word, bool)> {
        let mut out = Vec::new();
        let mut current = leaf;
        while let Some(parent) = self.parent(current) {
            let (discriminator, went_right) = match self.node(parent) {
                Node::Inner {
                    discriminator,
                    left,
                    right,
                    ..
                } => {
                    let went_right = *right == current;
                    debug_assert!(went_right || *left == current);
                    (discriminator.clone(), went_right)
                }
                Node::Leaf { .. } => unreachable!("parent is always inner"),
            };
            out.push((discriminator, went_right));
            current = parent;
        }
        out
    }

    /// All leaves under `id` (inclusive), found by walking the subtree.
    pub fn leaves_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match self.node(n) {
                Node::Leaf { .. } => out.push(n),
                Node::Inner { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }
        out
    }

    /// True iff `leaf`'s signature contains `("", true)` — i.e. the state it
    /// represents is accepting (global invariant 6, §9 Open Questions #2:
    /// enforced here rather than left implicit since the root's
    /// discriminator is always `""` by construction).
    pub fn leaf_is_accepting(&self, leaf: NodeId) -> bool {
        self.signature(leaf).iter().any(|(d, b)| d.is_empty() && *b)
    }

    /// All materialized states under `id` (inclusive).
    pub fn states_under(&self, id: NodeId) -> Vec<StateId> {
        self.leaves_under(id)
            .into_iter()
            .filter_map(|leaf| self.leaf_state(leaf))
            .collect()
    }

    /// True iff `id`'s node is an inner node still marked temporary.
    pub fn is_temporary(&self, id: NodeId) -> bool {
        matches!(
            self.node(id),
            Node::Inner {
                is_temporary: true,
                ..
            }
        )
    }

    /// Discriminator word of an inner node, if `id` is one.
    pub fn discriminator_of(&self, id: NodeId) -> Option<&Word> {
        match self.node(id) {
            Node::Inner { discriminator, .. } => Some(discriminator),
            Node::Leaf { .. } => None,
        }
    }

    /// Children `(left, right)` of an inner node, if `id` is one.
    pub fn children_of(&self, id: NodeId) -> Option<(NodeId, NodeId)> {
        match self.node(id) {
            Node::Inner { left, right, .. } => Some((*left, *right)),
            Node::Leaf { .. } => None,
        }
    }

    /// Every inner node id currently in the tree, in arena order. Used by
    /// `finalize_all_blocks` to find temporary apexes (§4.4 "Blocks").
    pub fn inner_node_ids(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| matches!(self.node(*id), Node::Inner { .. }))
            .collect()
    }
}

impl Default for DiscriminationTree {
    fn default() -> Self {
        Self::new()
    }
}
