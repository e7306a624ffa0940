//! An adaptive query engine for active automata learning.
//!
//! Active learning algorithms interrogate a black-box reactive system (the *system under
//! learning*, SUL) one input symbol at a time, where the next symbol to send may depend on the
//! outputs observed so far. This crate implements the machinery that executes such
//! [adaptive queries](query::AdaptiveQuery) — not the learning algorithms themselves, which are
//! external collaborators plugging in through the [`AdaptiveQuery`](query::AdaptiveQuery) and
//! [`Transducer`](mealy::Transducer) seams.
//!
//! The central piece is the [`AdaptiveQueryCache`](cache::AdaptiveQueryCache): a membership
//! oracle that answers queries from an incrementally grown, deterministic
//! [Mealy automaton](mealy::MealyMachine) wherever possible and forwards the rest to a delegate
//! oracle, folding everything the delegate observes back into the automaton. The cache automaton
//! doubles as a consistency witness: [`find_counterexample`](cache::AdaptiveQueryCache::find_counterexample)
//! searches for a word on which the cache and a learned hypothesis disagree. Cache contents can
//! be [suspended and resumed](oracle::Resumable) across process lifetimes.
//!
//! Around this core sit a [single-stream bridge](bridge::ObservationTreeBridge) that fronts an
//! observation tree for algorithms keeping their own tree (e.g. ADT-style learners), and a
//! [parallel batch layer](parallel) that fans query batches out over a
//! [fixed pool](parallel::StaticParallelOracle) of independent oracle instances or a
//! [demand-driven pool](parallel::DynamicParallelOracle) fed from a shared queue.
//!
//! Observations are sacred: a `(state, symbol)` pair that ever produced an output keeps it
//! forever, and a diverging observation aborts loudly with
//! [`OracleError::Inconsistent`](error::OracleError) — it means the target is non-deterministic
//! or its reset is broken, and no amount of caching can paper over that.

/// Growable input alphabets and the `Symbol`/`Output` marker traits.
pub mod alphabet;

/// The prefix-caching membership oracle and its snapshot type.
pub mod cache;

/// The single-stream observation-tree front.
pub mod bridge;

/// Separating-word search between cache and hypothesis.
pub mod equivalence;

/// The crate's error type.
pub mod error;

/// Arena-stored deterministic Mealy machines and the hypothesis seam.
pub mod mealy;

/// Oracle and SUL contracts, the direct delegate and the word-query front.
pub mod oracle;

/// Parallel batch execution over worker pools.
pub mod parallel;

/// The adaptive query protocol and the preset (fixed-word) query.
pub mod query;

/// Traces and trace builders.
pub mod word;

pub(crate) mod math;

#[cfg(test)]
pub(crate) mod testing;

/// Everything needed to pose adaptive queries against a cached, possibly
/// parallel oracle: `use adaptive_oracle::prelude::*;`.
pub mod prelude {
    pub use crate::alphabet::{Alphabet, Output, Symbol};
    pub use crate::bridge::ObservationTreeBridge;
    pub use crate::cache::{AdaptiveQueryCache, CacheSnapshot};
    pub use crate::error::OracleError;
    pub use crate::mealy::{MealyMachine, StateIndex, Transducer};
    pub use crate::oracle::{
        AdaptiveMembershipOracle, Resumable, Sul, SulOracle, WordOracle,
    };
    pub use crate::parallel::{DynamicParallelOracle, StaticParallelOracle};
    pub use crate::query::{AdaptiveQuery, PresetQuery, Response};
    pub use crate::word::{Trace, TraceBuilder};
}
