//! Error model for the learning engine (§7).
//!
//! All four error kinds are variants of a single `thiserror` enum, mirroring
//! `RenderError`/`DpaInfError` in the teacher crates rather than a
//! hierarchy of error types per module.

use thiserror::Error;

use crate::word::Word;

/// An error raised by the learning engine. All of these are fatal from the
/// engine's own point of view: per §7, the hypothesis may be in an
/// inconsistent state afterwards and callers must discard it.
#[derive(Debug, Error)]
pub enum LearnerError {
    /// An internal assertion failed. Carries the name of the violated
    /// invariant (see spec §3/§8's numbered invariants) and enough detail
    /// to reproduce it.
    #[error("invariant violated: {invariant} ({detail})")]
    InvariantViolation {
        invariant: &'static str,
        detail: String,
    },

    /// The teacher gave inconsistent answers: either two membership queries
    /// for the same word disagreed, or an equivalence query returned a
    /// counterexample on which hypothesis and target actually agree.
    #[error("oracle contract violated: {detail}")]
    OracleContractViolation { detail: String },

    /// The engine was used incorrectly, e.g. `run` was called while open
    /// transitions remain on the traversed path.
    #[error("usage error: {detail}")]
    UsageError { detail: String },

    /// A configured resource limit (membership-query budget, cache size)
    /// was exceeded. Unlike the other variants this is recoverable: the
    /// caller may call `to_dfa()` on the current hypothesis and stop.
    #[error("resource exhausted: {detail}")]
    ResourceExhausted { detail: String },
}

impl LearnerError {
    pub fn invariant(invariant: &'static str, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            invariant,
            detail: detail.into(),
        }
    }

    pub fn oracle_contract(detail: impl Into<String>) -> Self {
        Self::OracleContractViolation {
            detail: detail.into(),
        }
    }

    pub fn usage(detail: impl Into<String>) -> Self {
        Self::UsageError {
            detail: detail.into(),
        }
    }

    pub fn resource_exhausted(detail: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            detail: detail.into(),
        }
    }

    /// Builds an `OracleContractViolation` for the specific "counterexample
    /// is not a counterexample" case (§4.7, §7): RS search found no
    /// splitting index for `word`.
    pub fn not_a_counterexample(word: &Word) -> Self {
        Self::oracle_contract(format!(
            "RS search found no divergence index in counterexample {word:?}; \
             hypothesis and teacher already agree on it"
        ))
    }
}

pub type Result<T> = std::result::Result<T, LearnerError>;
