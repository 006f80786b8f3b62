//! Discriminator finalization (§4.5): shortens temporary discriminators
//! introduced by raw RS splits down to the shortest suffix that still
//! distinguishes the same states, without changing the tree's shape.
//!
//! Implemented as a post-order walk over "blocks" (maximal temporary
//! subtrees, §4.1/§4.4): children are finalized first, then each temporary
//! apex tries, in order, every single-symbol discriminator and then every
//! `symbol ++ child's discriminator` candidate, accepting the first one
//! that reproduces the apex's *existing* left/right state partition exactly
//! (DESIGN.md open-question resolution #4). If no candidate works the apex
//! is left temporary and retried on the next call.

use itertools::Itertools;
use tracing::trace;

use crate::alphabet::Alphabet;
use crate::cache::MembershipOracle;
use crate::error::Result;
use crate::hypothesis::Hypothesis;
use crate::ids::{NodeId, StateId};
use crate::tree::DiscriminationTree;
use crate::word::Word;

/// Runs finalization over the whole tree (§4.6 `finalize_all_blocks`).
pub fn finalize_all_blocks(
    tree: &mut DiscriminationTree,
    hypothesis: &Hypothesis,
    alphabet: &Alphabet,
    oracle: &mut MembershipOracle<'_>,
) -> Result<()> {
    finalize_node(tree, hypothesis, alphabet, oracle, tree.root())
}

fn finalize_node(
    tree: &mut DiscriminationTree,
    hypothesis: &Hypothesis,
    alphabet: &Alphabet,
    oracle: &mut MembershipOracle<'_>,
    node: NodeId,
) -> Result<()> {
    let Some((left, right)) = tree.children_of(node) else {
        return Ok(());
    };
    // Post-order: finalize descendants before this apex.
    finalize_node(tree, hypothesis, alphabet, oracle, left)?;
    finalize_node(tree, hypothesis, alphabet, oracle, right)?;

    if !tree.is_temporary(node) {
        return Ok(());
    }

    let left_states = tree.states_under(left);
    let right_states = tree.states_under(right);

    for candidate in candidates(tree, alphabet, left, right) {
        if matches_partition(hypothesis, &left_states, &right_states, &candidate, oracle)? {
            trace!(node = ?node, candidate = ?candidate, "finalized discriminator");
            tree.replace_with_final(node, candidate)?;
            return Ok(());
        }
    }
    trace!(node = ?node, "no finalizing candidate found this pass, left temporary");
    Ok(())
}

/// Candidate discriminators for a temporary apex, shortest first: every
/// single symbol, then every `symbol ++ child-discriminator` (§4.5 point 2,
/// §9: "typically `a · d` for the shortest `a ∈ Σ`").
fn candidates(tree: &DiscriminationTree, alphabet: &Alphabet, left: NodeId, right: NodeId) -> Vec<Word> {
    let singles = alphabet.iter().map(|a| Word::from_chars(std::iter::once(a)));
    let extended = alphabet
        .iter()
        .cartesian_product([left, right])
        .filter_map(|(a, child)| {
            tree.discriminator_of(child)
                .map(|d| Word::from_chars(std::iter::once(a)).concat(d))
        });
    singles.chain(extended).collect()
}

/// True iff every state in `left_states` answers `false` and every state in
/// `right_states` answers `true` to `is_member(access_sequence ++
/// candidate)` — i.e. `candidate` reproduces the apex's current partition
/// exactly.
fn matches_partition(
    hypothesis: &Hypothesis,
    left_states: &[StateId],
    right_states: &[StateId],
    candidate: &Word,
    oracle: &mut MembershipOracle<'_>,
) -> Result<bool> {
    for &q in left_states {
        let query = hypothesis.access_sequence(q).concat(candidate);
        if oracle.ask(&query)? {
            return Ok(false);
        }
    }
    for &q in right_states {
        let query = hypothesis.access_sequence(q).concat(candidate);
        if !oracle.ask(&query)? {
            return Ok(false);
        }
    }
    Ok(true)
}
