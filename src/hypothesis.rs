//! The hypothesis automaton (§3, §4.2): states with access sequences and a
//! total Σ-indexed transition function, whose edges start life as *non-tree*
//! (pointing into the discrimination tree) and are *closed* into *tree*
//! edges pointing at a materialized state.

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::alphabet::Alphabet;
use crate::cache::MembershipOracle;
use crate::error::{LearnerError, Result};
use crate::ids::{NodeId, StateId};
use crate::tree::DiscriminationTree;
use crate::word::Word;

/// Where a transition currently points: a materialized state (spanning-tree
/// edge) or a discrimination-tree node not yet known to have a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTarget {
    Tree(StateId),
    NonTree(NodeId),
}

#[derive(Debug, Clone)]
pub struct Transition {
    /// Access sequence of the owning state concatenated with the symbol
    /// (§3: "the canonical word routing through this edge").
    pub aseq: Word,
    pub target: TransitionTarget,
}

#[derive(Debug, Clone)]
struct StateData {
    access_sequence: Word,
    node: NodeId,
    transitions: IndexMap<char, Transition>,
}

/// The learner's current hypothesis automaton.
#[derive(Debug)]
pub struct Hypothesis {
    states: Vec<StateData>,
    start: Option<StateId>,
    final_states: IndexSet<StateId>,
    open_transitions: IndexSet<(StateId, char)>,
    /// States that already have an incoming tree transition; §4.3 allows at
    /// most one per state ("each tree transition has a unique owner").
    incoming_tree: IndexSet<StateId>,
}

impl Hypothesis {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            start: None,
            final_states: IndexSet::new(),
            open_transitions: IndexSet::new(),
            incoming_tree: IndexSet::new(),
        }
    }

    /// Allocates a fresh state with access sequence `access_sequence`,
    /// represented by DT leaf `node`. Every outgoing transition starts
    /// non-tree, targeting the tree root, and is enqueued into
    /// `open_transitions` (§4.2 `add_state`). Also registers each such
    /// transition in the root's `incoming_non_tree` set, so that a later
    /// split of the root (unlikely but not forbidden) would know to
    /// re-sift them.
    pub fn add_state(
        &mut self,
        access_sequence: Word,
        node: NodeId,
        alphabet: &Alphabet,
        tree: &mut DiscriminationTree,
    ) -> StateId {
        let id = StateId(self.states.len());
        let tree_root = tree.root();
        let mut transitions = IndexMap::new();
        for symbol in alphabet.iter() {
            let aseq = access_sequence.push(symbol);
            transitions.insert(
                symbol,
                Transition {
                    aseq,
                    target: TransitionTarget::NonTree(tree_root),
                },
            );
            self.open_transitions.insert((id, symbol));
            tree.add_incoming_non_tree(tree_root, id, symbol);
        }
        trace!(state = ?id, aseq = ?access_sequence, "add_state");
        self.states.push(StateData {
            access_sequence,
            node,
            transitions,
        });
        id
    }

    /// Designates `id` as the start state. Must be called exactly once,
    /// right after the first `add_state`.
    pub fn set_start(&mut self, id: StateId) {
        self.start = Some(id);
    }

    pub fn start(&self) -> StateId {
        self.start.expect("start state not yet set")
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len()).map(StateId)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn access_sequence(&self, q: StateId) -> &Word {
        &self.states[q.index()].access_sequence
    }

    pub fn node_of(&self, q: StateId) -> NodeId {
        self.states[q.index()].node
    }

    /// Updates `q`'s back-pointer to the DT leaf that now represents it.
    ///
    /// Needed because `split_leaf` (§4.1) re-places an already-materialized
    /// state into a freshly allocated *child* leaf when the state's old leaf
    /// is split by a counterexample: the old leaf's `NodeId` survives (it
    /// mutates in place into the new inner node, §9), but it is no longer a
    /// leaf, so `q`'s back-pointer must move to the child that inherited the
    /// state or `node_of(q)` would return a stale, now-inner handle. This is
    /// distinct from the "relink" the source's `link` leaves ambiguous
    /// (§9 Open Questions #1, forbidden by `DiscriminationTree::materialize_leaf`
    /// rejecting a second materialization of the same leaf): that ambiguity
    /// is about a state being moved onto a *different, already-leafy* node;
    /// this is the mandatory bookkeeping for the one leaf `q` has always
    /// represented simply growing a new handle underneath it.
    pub fn relink(&mut self, q: StateId, node: NodeId) {
        self.states[q.index()].node = node;
    }

    /// Asserts `q` is a known state, per §4.7's "unknown state passed to
    /// `make_final`" failure mode.
    pub fn make_final(&mut self, q: StateId) -> Result<()> {
        if q.index() >= self.states.len() {
            return Err(LearnerError::usage(format!(
                "make_final called with unknown state {q:?}"
            )));
        }
        self.final_states.insert(q);
        Ok(())
    }

    pub fn is_final(&self, q: StateId) -> bool {
        self.final_states.contains(&q)
    }

    pub fn open_transitions(&self) -> impl Iterator<Item = (StateId, char)> + '_ {
        self.open_transitions.iter().copied()
    }

    pub fn has_open_transitions(&self) -> bool {
        !self.open_transitions.is_empty()
    }

    pub fn pop_open_transition(&mut self) -> Option<(StateId, char)> {
        self.open_transitions.shift_remove_index(0)
    }

    pub fn transition(&self, q: StateId, symbol: char) -> &Transition {
        &self.states[q.index()].transitions[&symbol]
    }

    pub fn has_incoming_tree(&self, q: StateId) -> bool {
        self.incoming_tree.contains(&q)
    }

    /// Retargets `(q, symbol)` to a DT node, keeping it non-tree (§4.3:
    /// "remains non-tree but with its `target_node` advanced").
    ///
    /// Once `node` is a leaf with a materialized state, a non-tree
    /// transition targeting it is already *closed* in every sense that
    /// matters operationally (`run`/`evaluate`/equivalence queries all
    /// dereference a non-tree target's leaf state, see
    /// [`Hypothesis::resolve`]) — it is simply never promoted to *tree*
    /// because some other transition already owns that incoming edge in
    /// the spanning tree (§4.3: "each tree transition has a unique
    /// owner"). It is intentionally NOT re-enqueued into
    /// `open_transitions` here: `open_transitions` is the closure
    /// worklist of transitions that still need (re-)sifting, not a live
    /// mirror of "all non-tree transitions" — with `k` symbols and `n > 1`
    /// states there are always more than `n - 1` transitions, so most
    /// non-tree transitions are permanently non-tree once closed, and
    /// requeuing them here would spin `close_open_transitions` forever
    /// without any further state change to make progress on (§9 Open
    /// Questions' "at any stable point all transitions are tree
    /// transitions" is read as "all transitions are *closed*", not
    /// literally tree-owned, precisely because of this counting
    /// argument).
    pub fn retarget_non_tree(&mut self, q: StateId, symbol: char, node: NodeId) {
        let t = self.states[q.index()]
            .transitions
            .get_mut(&symbol)
            .expect("transition exists for every symbol");
        t.target = TransitionTarget::NonTree(node);
    }

    /// Demotes `(q, symbol)` back to a non-tree transition targeting `node`,
    /// freeing up `previous_target`'s incoming-tree slot. Used when a split
    /// invalidates the leaf that used to represent `previous_target`
    /// (§4.4 point 4): closure will re-sift `(q, symbol)` from `node` (now
    /// an inner node) and either re-promote it or materialize a new state.
    pub fn demote_to_non_tree(
        &mut self,
        q: StateId,
        symbol: char,
        node: NodeId,
        previous_target: StateId,
    ) {
        self.incoming_tree.shift_remove(&previous_target);
        let t = self.states[q.index()]
            .transitions
            .get_mut(&symbol)
            .expect("transition exists for every symbol");
        t.target = TransitionTarget::NonTree(node);
        self.open_transitions.insert((q, symbol));
    }

    /// Re-enqueues `(q, symbol)` for re-sifting without touching its target.
    /// Used when a leaf that a non-tree transition currently resolves
    /// through is split for some unrelated reason (the driver is splitting
    /// it to demote a different transition): the target `NodeId` is still
    /// correct, it is simply no longer a leaf, so closure must sift it
    /// again from there (§4.4 point 4, [`DiscriminationTree::incoming_non_tree`]).
    pub fn reopen(&mut self, q: StateId, symbol: char) {
        self.open_transitions.insert((q, symbol));
    }

    /// Promotes `(q, symbol)` to a tree transition targeting `target`.
    /// Fails if `target` already has an incoming tree transition (§4.3:
    /// "each tree transition has a unique owner").
    pub fn promote_to_tree(&mut self, q: StateId, symbol: char, target: StateId) -> Result<()> {
        if !self.incoming_tree.insert(target) {
            return Err(LearnerError::invariant(
                "unique-tree-owner",
                format!("state {target:?} already has an incoming tree transition"),
            ));
        }
        let t = self.states[q.index()]
            .transitions
            .get_mut(&symbol)
            .expect("transition exists for every symbol");
        t.target = TransitionTarget::Tree(target);
        self.open_transitions.shift_remove(&(q, symbol));
        trace!(from = ?q, %symbol, to = ?target, "promote transition to tree");
        Ok(())
    }

    /// Resolves `(q, symbol)` to a concrete target state, if one is known.
    /// A tree transition always resolves. A non-tree transition resolves
    /// iff its target DT node is currently a materialized leaf — which is
    /// true for every non-tree transition that closure has sifted at least
    /// once and that hasn't since been invalidated by a leaf split (in
    /// which case the node is now an inner node and resolution fails until
    /// the driver re-sifts it, see `learner::Ttt::process_counterexample`).
    ///
    /// Not every non-tree transition is ever promoted to tree: with `k`
    /// symbols and `n` states there are `k * n` transitions but at most
    /// `n - 1` tree edges (a spanning tree has one edge per non-start
    /// state), so most non-tree transitions stay non-tree forever once
    /// closed. They are just as usable as tree transitions for `run`,
    /// `evaluate`, and equivalence queries — "tree" vs. "non-tree" is a
    /// bookkeeping distinction about spanning-tree ownership, not about
    /// whether the transition is resolved.
    pub fn resolve_target(&self, q: StateId, symbol: char, tree: &DiscriminationTree) -> Option<StateId> {
        match self.transition(q, symbol).target {
            TransitionTarget::Tree(next) => Some(next),
            TransitionTarget::NonTree(node) => tree.leaf_state(node),
        }
    }

    /// Follows transitions (tree or resolved non-tree) to their target
    /// state. Fails (§4.7) if an unresolved transition is encountered on
    /// the path — the caller must close transitions first.
    pub fn run(&self, word: &Word, tree: &DiscriminationTree) -> Result<StateId> {
        let mut state = self.start();
        for symbol in word.as_slice() {
            let symbol = *symbol;
            state = self.resolve_target(state, symbol, tree).ok_or_else(|| {
                LearnerError::usage(format!(
                    "run() encountered an unresolved transition from {state:?} on '{symbol}'; \
                     call close_open_transitions() first or use run_non_deterministic"
                ))
            })?;
        }
        Ok(state)
    }

    /// Like `run`, but on a non-tree transition, soft-sifts the target node
    /// towards its leaf and continues from there. Does not itself close the
    /// transition into a tree edge (§9 Open Questions #3: the driver must
    /// always call `close_open_transitions` before relying on `run`).
    ///
    /// Returns an error if the sifted leaf has no materialized state yet:
    /// this should not occur operationally since the driver only evaluates
    /// counterexamples against an already-closed hypothesis, but the method
    /// is kept total rather than panicking.
    pub fn run_non_deterministic(
        &mut self,
        word: &Word,
        tree: &DiscriminationTree,
        oracle: &mut MembershipOracle<'_>,
    ) -> Result<StateId> {
        let mut state = self.start();
        for symbol in word.as_slice() {
            let symbol = *symbol;
            let target = self.transition(state, symbol).target;
            state = match target {
                TransitionTarget::Tree(next) => next,
                TransitionTarget::NonTree(node) => {
                    let aseq = self.transition(state, symbol).aseq.clone();
                    let leaf = tree.sift(&aseq, node, oracle)?;
                    self.retarget_non_tree(state, symbol, leaf);
                    tree.leaf_state(leaf).ok_or_else(|| {
                        LearnerError::invariant(
                            "soft-sift-materialized",
                            format!(
                                "soft sift of {aseq:?} reached unmaterialized leaf {leaf:?}"
                            ),
                        )
                    })?
                }
            };
        }
        Ok(state)
    }

    pub fn evaluate(&self, word: &Word, tree: &DiscriminationTree) -> Result<bool> {
        Ok(self.is_final(self.run(word, tree)?))
    }

    pub fn evaluate_non_deterministic(
        &mut self,
        word: &Word,
        tree: &DiscriminationTree,
        oracle: &mut MembershipOracle<'_>,
    ) -> Result<bool> {
        let state = self.run_non_deterministic(word, tree, oracle)?;
        Ok(self.is_final(state))
    }
}

impl Default for Hypothesis {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only projection handed to `Teacher::is_equivalent` (§6): bundles a
/// hypothesis with the discrimination tree needed to resolve non-tree
/// transitions, since a stable hypothesis generally has non-tree
/// transitions that are nonetheless fully resolved (see
/// [`Hypothesis::resolve_target`]).
pub struct HypothesisSnapshot<'a> {
    hypothesis: &'a Hypothesis,
    tree: &'a DiscriminationTree,
}

impl<'a> HypothesisSnapshot<'a> {
    pub fn new(hypothesis: &'a Hypothesis, tree: &'a DiscriminationTree) -> Self {
        Self { hypothesis, tree }
    }
}

impl<'a> crate::teacher::HypothesisView for HypothesisSnapshot<'a> {
    fn start(&self) -> usize {
        self.hypothesis.start().index()
    }

    fn states(&self) -> Vec<usize> {
        self.hypothesis.state_ids().map(|q| q.index()).collect()
    }

    fn is_final(&self, state: usize) -> bool {
        self.hypothesis.is_final(StateId(state))
    }

    fn transition(&self, state: usize, symbol: char) -> usize {
        self.hypothesis
            .resolve_target(StateId(state), symbol, self.tree)
            .unwrap_or_else(|| {
                panic!(
                    "HypothesisView::transition called with an unresolved transition from state \
                     {state} on '{symbol}'; equivalence queries must only be issued after \
                     close_open_transitions()"
                )
            })
            .index()
    }
}
