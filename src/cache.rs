//! Membership-query cache.
//!
//! The teacher must be assumed idempotent on membership queries (same word,
//! same answer — §5), so caching them has no semantic effect and is purely
//! a performance aid. Kept as a small standalone type next to the engine it
//! serves, in the spirit of the teacher's small utility wrappers.

use indexmap::IndexMap;

use crate::config::CacheSize;
use crate::word::Word;

/// A bounded or unbounded `Word -> bool` cache.
///
/// When bounded, eviction is FIFO (oldest insertion first) rather than true
/// LRU — a deliberate simplification, since membership-query locality
/// rarely matters for this workload and `IndexMap` gives FIFO eviction for
/// free via `shift_remove_index(0)`.
#[derive(Debug)]
pub struct MembershipCache {
    entries: IndexMap<Word, bool>,
    bound: CacheSize,
}

impl MembershipCache {
    pub fn new(bound: CacheSize) -> Self {
        Self {
            entries: IndexMap::new(),
            bound,
        }
    }

    pub fn get(&self, word: &Word) -> Option<bool> {
        self.entries.get(word).copied()
    }

    /// Records `word -> answer`. If a different answer was already cached
    /// for `word`, returns the stale answer so the caller can raise an
    /// oracle-contract-violation error (§7).
    pub fn insert(&mut self, word: Word, answer: bool) -> Option<bool> {
        if let Some(&existing) = self.entries.get(&word) {
            if existing != answer {
                return Some(existing);
            }
            return None;
        }
        if let CacheSize::Bounded(limit) = self.bound {
            while self.entries.len() >= limit && !self.entries.is_empty() {
                self.entries.shift_remove_index(0);
            }
        }
        self.entries.insert(word, answer);
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bundles a [`Teacher`](crate::teacher::Teacher) with a [`MembershipCache`]
/// behind a single `ask` entry point, so every membership query in the
/// engine goes through one place that can both cache and detect a
/// contradicting teacher (§7: oracle contract violation).
pub struct MembershipOracle<'a> {
    teacher: &'a dyn crate::teacher::Teacher,
    cache: MembershipCache,
}

impl<'a> MembershipOracle<'a> {
    pub fn new(teacher: &'a dyn crate::teacher::Teacher, bound: CacheSize) -> Self {
        Self {
            teacher,
            cache: MembershipCache::new(bound),
        }
    }

    /// Issues (or serves from cache) a membership query for `word`.
    pub fn ask(&mut self, word: &Word) -> crate::error::Result<bool> {
        if let Some(answer) = self.cache.get(word) {
            return Ok(answer);
        }
        let answer = self.teacher.is_member(word);
        if let Some(stale) = self.cache.insert(word.clone(), answer) {
            return Err(crate::error::LearnerError::oracle_contract(format!(
                "membership query for {word:?} returned {answer} but previously returned {stale}"
            )));
        }
        Ok(answer)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Issues an equivalence query. Not cached: §5 only requires membership
    /// idempotence, not equivalence idempotence.
    pub fn is_equivalent(&self, view: &dyn crate::teacher::HypothesisView) -> Option<Word> {
        self.teacher.is_equivalent(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_and_detects_contradiction() {
        let mut cache = MembershipCache::new(CacheSize::Unbounded);
        assert_eq!(cache.get(&Word::from_str("a")), None);
        assert_eq!(cache.insert(Word::from_str("a"), true), None);
        assert_eq!(cache.get(&Word::from_str("a")), Some(true));
        assert_eq!(cache.insert(Word::from_str("a"), true), None);
        assert_eq!(cache.insert(Word::from_str("a"), false), Some(true));
    }

    #[test]
    fn bounded_evicts_fifo() {
        let mut cache = MembershipCache::new(CacheSize::Bounded(2));
        cache.insert(Word::from_str("a"), true);
        cache.insert(Word::from_str("b"), true);
        cache.insert(Word::from_str("c"), true);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&Word::from_str("a")), None);
        assert_eq!(cache.get(&Word::from_str("c")), Some(true));
    }
}
