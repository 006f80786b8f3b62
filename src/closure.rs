//! Open-transition closure to fixpoint (§4.3).

use tracing::trace;

use crate::alphabet::Alphabet;
use crate::cache::MembershipOracle;
use crate::error::Result;
use crate::hypothesis::Hypothesis;
use crate::tree::DiscriminationTree;
use crate::word::Word;

/// Runs closure to fixpoint: while any transition still needs (re-)sifting,
/// sift it towards a leaf and either promote it to tree (materializing a
/// new state if needed) or leave it non-tree with an advanced target node.
///
/// Terminates because each leaf is materialized at most once, the DT has
/// finitely many leaves for a stable hypothesis, and a transition is only
/// ever re-enqueued here by the driver when a split has just invalidated
/// its target node — never by this function itself (§4.3).
pub fn close_open_transitions(
    hypothesis: &mut Hypothesis,
    tree: &mut DiscriminationTree,
    alphabet: &Alphabet,
    oracle: &mut MembershipOracle<'_>,
) -> Result<()> {
    while let Some((state, symbol)) = hypothesis.pop_open_transition() {
        let aseq = hypothesis.transition(state, symbol).aseq.clone();
        let start_node = match hypothesis.transition(state, symbol).target {
            crate::hypothesis::TransitionTarget::NonTree(node) => node,
            crate::hypothesis::TransitionTarget::Tree(_) => {
                // Already closed by an earlier pop of the same entry; skip.
                continue;
            }
        };
        let leaf = tree.sift(&aseq, start_node, oracle)?;
        tree.remove_incoming_non_tree(start_node, state, symbol);

        if let Some(existing_state) = tree.leaf_state(leaf) {
            if !hypothesis.has_incoming_tree(existing_state) {
                hypothesis.promote_to_tree(state, symbol, existing_state)?;
                trace!(from = ?state, %symbol, to = ?existing_state, "closed transition onto existing state");
            } else {
                hypothesis.retarget_non_tree(state, symbol, leaf);
                tree.add_incoming_non_tree(leaf, state, symbol);
                trace!(from = ?state, %symbol, leaf = ?leaf, "left transition closed as non-tree, advanced target");
            }
        } else {
            let new_state = hypothesis.add_state(aseq.clone(), leaf, alphabet, tree);
            tree.materialize_leaf(leaf, new_state)?;
            if tree.leaf_is_accepting(leaf) {
                hypothesis.make_final(new_state)?;
            }
            hypothesis.promote_to_tree(state, symbol, new_state)?;
            trace!(from = ?state, %symbol, new_state = ?new_state, aseq = ?aseq, "materialized new state");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSize;
    use crate::teacher::{HypothesisView, Teacher};

    /// Accepts words with an odd number of 'a's.
    struct OddAs;
    impl Teacher for OddAs {
        fn is_member(&self, word: &Word) -> bool {
            word.as_slice().iter().filter(|c| **c == 'a').count() % 2 == 1
        }
        fn is_equivalent(&self, _h: &dyn HypothesisView) -> Option<Word> {
            None
        }
    }

    #[test]
    fn closure_terminates_and_closes_initial_state() {
        let alphabet = Alphabet::from_str("ab");
        let teacher = OddAs;
        let mut tree = DiscriminationTree::new();
        let mut hypothesis = Hypothesis::new();
        let mut oracle = MembershipOracle::new(&teacher, CacheSize::Unbounded);

        let root = tree.root();
        let leaf = tree.sift(&Word::empty(), root, &mut oracle).unwrap();
        let q0 = hypothesis.add_state(Word::empty(), leaf, &alphabet, &mut tree);
        hypothesis.set_start(q0);
        tree.materialize_leaf(leaf, q0).unwrap();

        close_open_transitions(&mut hypothesis, &mut tree, &alphabet, &mut oracle).unwrap();

        assert!(!hypothesis.has_open_transitions());
        assert!(hypothesis.run(&Word::from_str("a"), &tree).is_ok());
        assert!(hypothesis.run(&Word::from_str("b"), &tree).is_ok());
    }
}
