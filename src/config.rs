//! Configuration knobs for the learner (§6).

/// Search strategy used by the RS counterexample analyzer (§4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RsSearchMode {
    /// O(log n) membership queries via binary search with `alpha_cache`
    /// memoization. Default.
    #[default]
    Eager,
    /// O(n) linear scan fallback; useful for testing the eager search
    /// against a simple reference.
    Linear,
}

/// Bound on the membership-query cache (§5: "permitted and encouraged for
/// performance; it has no semantic effect").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheSize {
    #[default]
    Unbounded,
    Bounded(usize),
}

/// Tunable knobs for a [`crate::learner::Ttt`] instance.
///
/// The alphabet itself is supplied separately to `Ttt::new`, matching §6's
/// phrasing ("Configuration: the alphabet Σ, and optional knobs").
#[derive(Clone, Debug)]
pub struct LearnerConfig {
    pub rs_search_mode: RsSearchMode,
    pub finalize_after_each_cx: bool,
    pub query_cache_size: CacheSize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            rs_search_mode: RsSearchMode::Eager,
            finalize_after_each_cx: true,
            query_cache_size: CacheSize::Unbounded,
        }
    }
}
