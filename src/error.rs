use std::fmt::Debug;

use thiserror::Error;

/// The faults that can surface while executing adaptive queries against a
/// cache, an observation tree or a delegate oracle.
///
/// None of these are retried anywhere in this crate. A consistency fault means
/// the system under learning is non-deterministic or its reset is broken, so
/// any recorded observations are suspect and the operation must abort loudly.
#[derive(Debug, Error)]
pub enum OracleError {
    /// A `(state, symbol)` pair produced an output that differs from what was
    /// recorded for it earlier. Observations are never overwritten.
    #[error("inconsistent observation for input {input}: recorded {recorded}, observed {observed}")]
    Inconsistent {
        /// The input symbol on which the observations diverge.
        input: String,
        /// The output that the cache had recorded for this transition.
        recorded: String,
        /// The conflicting output that was observed now.
        observed: String,
    },
    /// An input symbol was used that is not part of the alphabet. Symbols must
    /// be announced through the growing-alphabet interface before they appear
    /// in queries.
    #[error("input symbol {0} is not part of the alphabet")]
    UnknownSymbol(String),
    /// The underlying system under learning reported a failure. This aborts
    /// the whole batch, partial results are discarded.
    #[error("delegate failure: {0}")]
    Delegate(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl OracleError {
    /// Builds the consistency fault for a diverging observation.
    pub fn inconsistent(input: impl Debug, recorded: impl Debug, observed: impl Debug) -> Self {
        Self::Inconsistent {
            input: format!("{input:?}"),
            recorded: format!("{recorded:?}"),
            observed: format!("{observed:?}"),
        }
    }

    /// Builds the fault for a symbol outside the alphabet.
    pub fn unknown_symbol(symbol: impl Debug) -> Self {
        Self::UnknownSymbol(format!("{symbol:?}"))
    }

    /// Wraps an error reported by a delegate system under learning.
    pub fn delegate(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delegate(Box::new(err))
    }
}
