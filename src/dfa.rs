//! Exporting a stable hypothesis to a standalone DFA (§4.2 `to_dfa`, §6).
//!
//! Grounded on the plain `DFA<V>` struct pattern in
//! `other_examples/…wkordalski-rustomaton…src-dfa.rs.rs`
//! (`alphabet`, `initial`, `finals`, `transitions: Vec<Map<symbol, state>>`),
//! adapted to `indexmap` for deterministic iteration.

use indexmap::{IndexMap, IndexSet};

use crate::alphabet::Alphabet;
use crate::hypothesis::Hypothesis;
use crate::tree::DiscriminationTree;
use crate::word::Word;

/// A standalone, total DFA snapshot: integer state ids, a total `Σ × State
/// -> State` transition table, and a set of accepting ids (§6).
#[derive(Debug, Clone)]
pub struct Dfa {
    pub alphabet: Alphabet,
    pub initial: usize,
    pub finals: IndexSet<usize>,
    pub transitions: Vec<IndexMap<char, usize>>,
}

impl Dfa {
    pub fn size(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_final(&self, state: usize) -> bool {
        self.finals.contains(&state)
    }

    /// Runs `word` from `initial` through the total transition table.
    pub fn accepts(&self, word: &Word) -> bool {
        let mut state = self.initial;
        for symbol in word.as_slice() {
            state = *self.transitions[state]
                .get(symbol)
                .expect("dfa transition table is total over the alphabet");
        }
        self.is_final(state)
    }
}

/// Snapshots `hypothesis` into a [`Dfa`]. A transition is resolved through
/// `tree` whether it is tree or non-tree (§4.2: most transitions in a
/// stable hypothesis stay non-tree forever, see
/// [`Hypothesis::resolve_target`]); any transition that is genuinely still
/// unresolved (should not occur on a stable hypothesis) is routed to a
/// freshly added non-accepting sink state so the result is always total.
pub fn to_dfa(hypothesis: &Hypothesis, tree: &DiscriminationTree, alphabet: &Alphabet) -> Dfa {
    let n = hypothesis.len();
    const PENDING: usize = usize::MAX;
    let mut transitions: Vec<IndexMap<char, usize>> = vec![IndexMap::new(); n];
    let mut needs_sink = false;

    for q in hypothesis.state_ids() {
        for symbol in alphabet.iter() {
            let target = match hypothesis.resolve_target(q, symbol, tree) {
                Some(t) => t.index(),
                None => {
                    needs_sink = true;
                    PENDING
                }
            };
            transitions[q.index()].insert(symbol, target);
        }
    }

    let finals: IndexSet<usize> = hypothesis
        .state_ids()
        .filter(|q| hypothesis.is_final(*q))
        .map(|q| q.index())
        .collect();

    if needs_sink {
        let sink = n;
        transitions.push(alphabet.iter().map(|s| (s, sink)).collect());
        for row in transitions.iter_mut().take(n) {
            for v in row.values_mut() {
                if *v == PENDING {
                    *v = sink;
                }
            }
        }
    }

    Dfa {
        alphabet: alphabet.clone(),
        initial: hypothesis.start().index(),
        finals,
        transitions,
    }
}
