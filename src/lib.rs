//! TTT active automaton learning.
//!
//! Given black-box access to an unknown regular language via a [`Teacher`]
//! that answers membership and equivalence queries, [`Ttt`] infers a
//! minimal [`Dfa`] recognizing that language, following the discrimination-
//! tree-based algorithm of Isberner, Howar & Steffen (2014).
//!
//! ```no_run
//! use ttt_learner::{Alphabet, LearnerConfig, Teacher, Word};
//! use ttt_learner::teacher::HypothesisView;
//!
//! struct EndsInAb;
//! impl Teacher for EndsInAb {
//!     fn is_member(&self, word: &Word) -> bool {
//!         let s = word.as_slice();
//!         s.len() >= 2 && s[s.len() - 2] == 'a' && s[s.len() - 1] == 'b'
//!     }
//!     fn is_equivalent(&self, hypothesis: &dyn HypothesisView) -> Option<Word> {
//!         // a real teacher would search more thoroughly; omitted here.
//!         None
//!     }
//! }
//!
//! let alphabet = Alphabet::from_str("ab");
//! let teacher = EndsInAb;
//! let mut learner = ttt_learner::Ttt::new(alphabet, &teacher, LearnerConfig::default()).unwrap();
//! let dfa = learner.infer().unwrap();
//! ```

pub mod alphabet;
pub mod cache;
pub mod closure;
pub mod config;
pub mod counterexample;
pub mod dfa;
pub mod error;
pub mod finalize;
pub mod hypothesis;
pub mod ids;
pub mod learner;
pub mod teacher;
pub mod tree;
pub mod word;

pub use alphabet::Alphabet;
pub use config::{CacheSize, LearnerConfig, RsSearchMode};
pub use dfa::Dfa;
pub use error::{LearnerError, Result};
pub use learner::Ttt;
pub use teacher::Teacher;
pub use word::Word;
