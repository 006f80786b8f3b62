//! The top-level TTT driver (§4.6).

use tracing::{debug, info};

use crate::alphabet::Alphabet;
use crate::cache::MembershipOracle;
use crate::closure::close_open_transitions;
use crate::config::LearnerConfig;
use crate::counterexample::analyze_counterexample;
use crate::dfa::{self, Dfa};
use crate::error::{LearnerError, Result};
use crate::finalize::finalize_all_blocks;
use crate::hypothesis::{Hypothesis, HypothesisSnapshot};
use crate::teacher::Teacher;
use crate::tree::DiscriminationTree;
use crate::word::Word;

/// The TTT active automaton learner. Owns the discrimination tree, the
/// current hypothesis, and the membership-query cache; borrows the teacher
/// for its whole lifetime (§5: single owner, synchronous).
pub struct Ttt<'t> {
    alphabet: Alphabet,
    tree: DiscriminationTree,
    hypothesis: Hypothesis,
    config: LearnerConfig,
    oracle: MembershipOracle<'t>,
}

impl<'t> Ttt<'t> {
    /// Initializes a one-state hypothesis with DT root `Inner("")` and
    /// closes it (§4.6).
    pub fn new(alphabet: Alphabet, teacher: &'t dyn Teacher, config: LearnerConfig) -> Result<Self> {
        let mut tree = DiscriminationTree::new();
        let mut hypothesis = Hypothesis::new();
        let mut oracle = MembershipOracle::new(teacher, config.query_cache_size);

        let root = tree.root();
        let leaf = tree.sift(&Word::empty(), root, &mut oracle)?;
        let q0 = hypothesis.add_state(Word::empty(), leaf, &alphabet, &mut tree);
        hypothesis.set_start(q0);
        tree.materialize_leaf(leaf, q0)?;
        if tree.leaf_is_accepting(leaf) {
            hypothesis.make_final(q0)?;
        }

        close_open_transitions(&mut hypothesis, &mut tree, &alphabet, &mut oracle)?;
        if config.finalize_after_each_cx {
            finalize_all_blocks(&mut tree, &hypothesis, &alphabet, &mut oracle)?;
        }

        Ok(Self {
            alphabet,
            tree,
            hypothesis,
            config,
            oracle,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn hypothesis(&self) -> &Hypothesis {
        &self.hypothesis
    }

    pub fn membership_query_count(&self) -> usize {
        self.oracle.cache_len()
    }

    /// Runs the driver loop to completion: equivalence query, RS analysis,
    /// split, close, finalize, repeat; returns the final DFA once the
    /// teacher reports no counterexample (§4.6).
    pub fn infer(&mut self) -> Result<Dfa> {
        loop {
            let snapshot = HypothesisSnapshot::new(&self.hypothesis, &self.tree);
            let cx = self.oracle.is_equivalent(&snapshot);
            let Some(cx) = cx else {
                info!(states = self.hypothesis.len(), "converged");
                break;
            };
            debug!(?cx, "received counterexample");
            self.process_counterexample(cx)?;
        }
        Ok(dfa::to_dfa(&self.hypothesis, &self.tree, &self.alphabet))
    }

    fn process_counterexample(&mut self, cx: Word) -> Result<()> {
        let (u, a, v) = analyze_counterexample(
            &self.hypothesis,
            &self.tree,
            &cx,
            self.config.rs_search_mode,
            &mut self.oracle,
        )?;
        debug!(?u, %a, ?v, "rs decomposition");

        let q = self.hypothesis.run(&u, &self.tree)?;
        // The transition being split need not be a *tree* edge: most
        // transitions in a stable hypothesis are non-tree-but-resolved
        // (§4.2/§9 Open Questions #7, e.g. every self-loop beyond the first
        // incoming edge of a state), and the RS decomposition may just as
        // well diverge on one of those. Either way its current target state
        // is whatever `resolve_target` gives; only a transition that is
        // still genuinely unresolved (pointing at an inner node) is an
        // error here, since the driver always closes before analyzing.
        let was_tree_edge = matches!(
            self.hypothesis.transition(q, a).target,
            crate::hypothesis::TransitionTarget::Tree(_)
        );
        let old_target = self.hypothesis.resolve_target(q, a, &self.tree).ok_or_else(|| {
            LearnerError::invariant(
                "closed-before-analysis",
                format!(
                    "transition ({q:?}, '{a}') was still open when analyzing counterexample {cx:?}"
                ),
            )
        })?;
        let leaf = self.hypothesis.node_of(old_target);
        let old_aseq = self.hypothesis.access_sequence(old_target).clone();

        // Any other transition currently resolving non-tree through `leaf`
        // is about to be invalidated too: `leaf` is turning into an inner
        // node, so those transitions must be re-sifted from there once
        // closure runs, even though their target `NodeId` is still correct
        // (§4.4 point 4). If `(q, a)` itself was non-tree, it is already a
        // member of this set (every resolved non-tree transition is
        // registered at its target leaf) so it needs no special handling
        // beyond the reopen loop below.
        let stale: Vec<(crate::ids::StateId, char)> = self.tree.incoming_non_tree(leaf).collect();

        self.tree
            .split_leaf(leaf, v, Some((old_target, &old_aseq)), &mut self.oracle)?;
        if was_tree_edge {
            // Only a genuine tree edge's demotion frees up `old_target`'s
            // incoming-tree slot (§4.3 "unique owner"); a non-tree `(q, a)`
            // never held that slot, so touching it here would let some
            // other state wrongly steal `old_target`'s real tree edge.
            self.hypothesis.demote_to_non_tree(q, a, leaf, old_target);
        } else {
            self.hypothesis.reopen(q, a);
        }
        for (state, symbol) in stale {
            self.hypothesis.reopen(state, symbol);
        }

        // `leaf` just mutated from a leaf into an inner node; `old_target`
        // was re-placed into whichever of its two fresh children matches
        // its own membership answer (`DiscriminationTree::split_leaf`).
        // `old_target`'s back-pointer must follow it there, or a later
        // counterexample targeting `old_target` again would hand
        // `node_of` the stale, now-inner `leaf` handle and fail to split it.
        let (left, right) = self
            .tree
            .children_of(leaf)
            .expect("leaf was just turned into an inner node by split_leaf");
        let new_node = if self.tree.leaf_state(left) == Some(old_target) {
            left
        } else {
            debug_assert_eq!(self.tree.leaf_state(right), Some(old_target));
            right
        };
        self.hypothesis.relink(old_target, new_node);

        close_open_transitions(
            &mut self.hypothesis,
            &mut self.tree,
            &self.alphabet,
            &mut self.oracle,
        )?;
        if self.config.finalize_after_each_cx {
            finalize_all_blocks(&mut self.tree, &self.hypothesis, &self.alphabet, &mut self.oracle)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::teacher::HypothesisView;

    /// Accepts words with an odd number of 'a's (Scenario D).
    struct OddAs;
    impl Teacher for OddAs {
        fn is_member(&self, word: &Word) -> bool {
            word.as_slice().iter().filter(|c| **c == 'a').count() % 2 == 1
        }
        fn is_equivalent(&self, hypothesis: &dyn HypothesisView) -> Option<Word> {
            for w in ["", "a", "b", "aa", "ab", "ba", "bb", "aaa", "aab"] {
                let word = Word::from_str(w);
                if hypothesis.evaluate(&word) != self.is_member(&word) {
                    return Some(word);
                }
            }
            None
        }
    }

    #[test]
    fn infers_two_state_parity_automaton() {
        let alphabet = Alphabet::from_str("ab");
        let teacher = OddAs;
        let mut learner = Ttt::new(alphabet, &teacher, LearnerConfig::default()).unwrap();
        let dfa = learner.infer().unwrap();
        assert_eq!(dfa.size(), 2);
        assert!(!dfa.accepts(&Word::empty()));
        assert!(dfa.accepts(&Word::from_str("a")));
        assert!(!dfa.accepts(&Word::from_str("aa")));
        assert!(dfa.accepts(&Word::from_str("aaa")));
    }

    struct AlwaysFalse;
    impl Teacher for AlwaysFalse {
        fn is_member(&self, _word: &Word) -> bool {
            false
        }
        fn is_equivalent(&self, _hypothesis: &dyn HypothesisView) -> Option<Word> {
            None
        }
    }

    #[test]
    fn infers_empty_language() {
        let alphabet = Alphabet::from_str("ab");
        let teacher = AlwaysFalse;
        let mut learner = Ttt::new(alphabet, &teacher, LearnerConfig::default()).unwrap();
        let dfa = learner.infer().unwrap();
        assert_eq!(dfa.size(), 1);
        assert!(dfa.finals.is_empty());
    }

    struct AlwaysTrue;
    impl Teacher for AlwaysTrue {
        fn is_member(&self, _word: &Word) -> bool {
            true
        }
        fn is_equivalent(&self, _hypothesis: &dyn HypothesisView) -> Option<Word> {
            None
        }
    }

    #[test]
    fn infers_universal_language() {
        let alphabet = Alphabet::from_str("ab");
        let teacher = AlwaysTrue;
        let mut learner = Ttt::new(alphabet, &teacher, LearnerConfig::default()).unwrap();
        let dfa = learner.infer().unwrap();
        assert_eq!(dfa.size(), 1);
        assert!(dfa.is_final(dfa.initial));
    }

    /// "ends in ab" needs 3 states and, over the course of learning it,
    /// splits the same state's discrimination-tree leaf more than once —
    /// a regression check that `node_of`/`relink` keep a state's leaf
    /// back-pointer current across repeated splits rather than handing a
    /// later split a stale, already-inner `NodeId`.
    struct EndsInAb;
    impl Teacher for EndsInAb {
        fn is_member(&self, word: &Word) -> bool {
            let s = word.as_slice();
            s.len() >= 2 && s[s.len() - 2] == 'a' && s[s.len() - 1] == 'b'
        }
        fn is_equivalent(&self, hypothesis: &dyn HypothesisView) -> Option<Word> {
            let mut frontier = vec![Word::empty()];
            let mut words = frontier.clone();
            for _ in 0..8 {
                let mut next = Vec::new();
                for w in &frontier {
                    for a in ['a', 'b'] {
                        let w2 = w.push(a);
                        words.push(w2.clone());
                        next.push(w2);
                    }
                }
                frontier = next;
            }
            words
                .into_iter()
                .find(|w| hypothesis.evaluate(w) != self.is_member(w))
        }
    }

    #[test]
    fn infers_ends_in_ab_with_repeated_leaf_splits() {
        let alphabet = Alphabet::from_str("ab");
        let teacher = EndsInAb;
        let mut learner = Ttt::new(alphabet, &teacher, LearnerConfig::default()).unwrap();
        let dfa = learner.infer().unwrap();
        assert_eq!(dfa.size(), 3);
        assert!(dfa.accepts(&Word::from_str("ab")));
        assert!(dfa.accepts(&Word::from_str("aab")));
        assert!(!dfa.accepts(&Word::from_str("abb")));
        assert!(!dfa.accepts(&Word::from_str("bba")));
    }
}
