//! End-to-end scenarios A–F (§8): each is a small hand-written [`Teacher`]
//! fixture (a closure-backed target language plus a bounded-BFS equivalence
//! check) driving [`Ttt::infer`] to a final [`Dfa`], checked against the
//! expected ground truth.

use ttt_learner::teacher::HypothesisView;
use ttt_learner::{Alphabet, LearnerConfig, Teacher, Ttt, Word};

/// A teacher built from a membership predicate and a bounded-BFS
/// equivalence check: enumerates all words up to `max_len` over the given
/// alphabet and returns the first one on which the hypothesis disagrees.
/// This is test-only fixture code, not a general oracle (kept out of the
/// core per the crate's scope).
struct BoundedOracle<F> {
    alphabet: Vec<char>,
    max_len: usize,
    member: F,
}

impl<F: Fn(&Word) -> bool> BoundedOracle<F> {
    fn new(alphabet: &str, max_len: usize, member: F) -> Self {
        Self {
            alphabet: alphabet.chars().collect(),
            max_len,
            member,
        }
    }

    fn words_up_to(&self, max_len: usize) -> Vec<Word> {
        let mut words = vec![Word::empty()];
        let mut frontier = vec![Word::empty()];
        for _ in 0..max_len {
            let mut next = Vec::new();
            for w in &frontier {
                for &a in &self.alphabet {
                    let w2 = w.push(a);
                    words.push(w2.clone());
                    next.push(w2);
                }
            }
            frontier = next;
        }
        words
    }
}

impl<F: Fn(&Word) -> bool> Teacher for BoundedOracle<F> {
    fn is_member(&self, word: &Word) -> bool {
        (self.member)(word)
    }

    fn is_equivalent(&self, hypothesis: &dyn HypothesisView) -> Option<Word> {
        for word in self.words_up_to(self.max_len) {
            if hypothesis.evaluate(&word) != self.is_member(&word) {
                return Some(word);
            }
        }
        None
    }
}

fn learn<F: Fn(&Word) -> bool>(
    alphabet_str: &str,
    max_len: usize,
    member: F,
) -> ttt_learner::Dfa {
    let alphabet = Alphabet::from_str(alphabet_str);
    let teacher = BoundedOracle::new(alphabet_str, max_len, member);
    let mut learner = Ttt::new(alphabet, &teacher, LearnerConfig::default()).unwrap();
    learner.infer().unwrap()
}

/// Scenario A: `(4i+3)` a's, Σ = {a, b}. Regex `b*a(b*ab*ab*ab*)+b*`.
#[test]
fn scenario_a_four_i_plus_three_as() {
    let member = |w: &Word| {
        let count = w.as_slice().iter().filter(|c| **c == 'a').count();
        count >= 3 && (count - 3) % 4 == 0
    };
    let dfa = learn("ab", 10, member);
    assert_eq!(dfa.size(), 4);
    assert!(dfa.accepts(&Word::from_str("aaa")));
    assert!(!dfa.accepts(&Word::from_str("aaaa")));
    assert!(dfa.accepts(&Word::from_str("bbbaaabbb")));
    assert!(!dfa.accepts(&Word::empty()));
}

/// Scenario B: empty language.
#[test]
fn scenario_b_empty_language() {
    let dfa = learn("ab", 6, |_w: &Word| false);
    assert_eq!(dfa.size(), 1);
    assert!(dfa.finals.is_empty());
}

/// Scenario C: Σ* (all strings).
#[test]
fn scenario_c_universal_language() {
    let dfa = learn("ab", 6, |_w: &Word| true);
    assert_eq!(dfa.size(), 1);
    assert!(dfa.is_final(dfa.initial));
}

/// Scenario D: parity of a's.
#[test]
fn scenario_d_parity_of_as() {
    let member = |w: &Word| w.as_slice().iter().filter(|c| **c == 'a').count() % 2 == 1;
    let dfa = learn("ab", 6, member);
    assert_eq!(dfa.size(), 2);
    assert!(dfa.accepts(&Word::from_str("a")));
    assert!(!dfa.accepts(&Word::empty()));
    assert!(dfa.accepts(&Word::from_str("aaa")));
    assert!(!dfa.accepts(&Word::from_str("aa")));
}

/// Scenario E: ends with `ab`.
#[test]
fn scenario_e_ends_with_ab() {
    let member = |w: &Word| {
        let s = w.as_slice();
        s.len() >= 2 && s[s.len() - 2] == 'a' && s[s.len() - 1] == 'b'
    };
    let dfa = learn("ab", 8, member);
    assert_eq!(dfa.size(), 3);
    assert!(dfa.accepts(&Word::from_str("ab")));
    assert!(dfa.accepts(&Word::from_str("aab")));
    assert!(!dfa.accepts(&Word::from_str("abb")));
    assert!(!dfa.accepts(&Word::from_str("bba")));
}

/// Scenario F: contains `aba`.
#[test]
fn scenario_f_contains_aba() {
    let member = |w: &Word| {
        let s = w.as_slice();
        s.windows(3)
            .any(|win| win[0] == 'a' && win[1] == 'b' && win[2] == 'a')
    };
    let dfa = learn("ab", 8, member);
    assert_eq!(dfa.size(), 4);
    assert!(dfa.accepts(&Word::from_str("aba")));
    assert!(dfa.accepts(&Word::from_str("bbabaab")));
    assert!(!dfa.accepts(&Word::from_str("abb")));
    assert!(!dfa.accepts(&Word::empty()));
}

/// Determinism law (§8): the same teacher and a fixed learner configuration
/// must produce byte-identical DFAs (and therefore the same membership
/// query count) across independent runs.
#[test]
fn determinism_across_repeated_runs() {
    let member = |w: &Word| w.as_slice().iter().filter(|c| **c == 'a').count() % 2 == 1;

    let alphabet1 = Alphabet::from_str("ab");
    let teacher1 = BoundedOracle::new("ab", 6, member);
    let mut learner1 = Ttt::new(alphabet1, &teacher1, LearnerConfig::default()).unwrap();
    let dfa1 = learner1.infer().unwrap();

    let alphabet2 = Alphabet::from_str("ab");
    let teacher2 = BoundedOracle::new("ab", 6, member);
    let mut learner2 = Ttt::new(alphabet2, &teacher2, LearnerConfig::default()).unwrap();
    let dfa2 = learner2.infer().unwrap();

    assert_eq!(dfa1.size(), dfa2.size());
    assert_eq!(learner1.membership_query_count(), learner2.membership_query_count());
}
