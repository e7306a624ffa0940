use tracing::trace;

use crate::alphabet::{Output, Symbol};
use crate::error::OracleError;
use crate::query::{AdaptiveQuery, PresetQuery, Response};

/// A membership oracle that answers [`AdaptiveQuery`]s. All results are
/// delivered by side effect through each query's own
/// [`process_output`](AdaptiveQuery::process_output) calls; the method returns
/// once every query in the batch is finished.
///
/// A delegate fault aborts the whole batch. Queries that were already answered
/// keep their answers, but no guarantees are made for the rest, so callers
/// must treat the batch as failed.
pub trait AdaptiveMembershipOracle<I, O> {
    /// Processes the batch to completion.
    fn process_queries<Q>(&mut self, queries: &mut [Q]) -> Result<(), OracleError>
    where
        Q: AdaptiveQuery<I, O> + Send;
}

/// The system under learning: a black-box reactive target that consumes one
/// input symbol at a time. Both operations block and are assumed
/// deterministic given an unbroken input sequence since the last reset.
pub trait Sul<I, O> {
    /// The failure type of the concrete target.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the target to its initial state.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Sends one input and observes the produced output.
    fn step(&mut self, input: I) -> Result<O, Self::Error>;
}

/// The plain delegate oracle: drives every query directly against a [`Sul`],
/// resetting it before each query and on every [`Response::Reset`].
#[derive(Clone, Debug)]
pub struct SulOracle<S> {
    sul: S,
}

impl<S> SulOracle<S> {
    /// Wraps the given system under learning.
    pub fn new(sul: S) -> Self {
        Self { sul }
    }

    /// Consumes the oracle, handing back the wrapped target.
    pub fn into_inner(self) -> S {
        self.sul
    }
}

impl<I, O, S> AdaptiveMembershipOracle<I, O> for SulOracle<S>
where
    I: Symbol,
    O: Output,
    S: Sul<I, O>,
{
    fn process_queries<Q>(&mut self, queries: &mut [Q]) -> Result<(), OracleError>
    where
        Q: AdaptiveQuery<I, O> + Send,
    {
        for query in queries {
            self.sul.reset().map_err(OracleError::delegate)?;

            loop {
                let input = query.next_input();
                let output = self.sul.step(input).map_err(OracleError::delegate)?;

                match query.process_output(output) {
                    Response::Symbol => {}
                    Response::Reset => self.sul.reset().map_err(OracleError::delegate)?,
                    Response::Finished => break,
                }
            }
        }
        Ok(())
    }
}

/// Answers classic `(prefix, suffix)` membership queries through an adaptive
/// oracle by wrapping each one in a [`PresetQuery`]. Queries with an empty
/// suffix are answered with the empty word without touching the oracle.
#[derive(Clone, Debug)]
pub struct WordOracle<T> {
    oracle: T,
}

impl<T> WordOracle<T> {
    /// Wraps the given adaptive oracle.
    pub fn new(oracle: T) -> Self {
        Self { oracle }
    }

    /// A reference to the wrapped oracle.
    pub fn inner(&self) -> &T {
        &self.oracle
    }

    /// Consumes the wrapper, handing back the oracle.
    pub fn into_inner(self) -> T {
        self.oracle
    }

    /// Answers a single word query, returning the outputs for the suffix.
    pub fn answer<I, O>(&mut self, prefix: &[I], suffix: &[I]) -> Result<Vec<O>, OracleError>
    where
        I: Symbol,
        O: Output,
        T: AdaptiveMembershipOracle<I, O>,
    {
        let mut answers = self.answer_all(std::iter::once((prefix.to_vec(), suffix.to_vec())))?;
        Ok(answers.pop().expect("one query in, one answer out"))
    }

    /// Answers a batch of word queries in one oracle round, preserving order.
    pub fn answer_all<I, O>(
        &mut self,
        words: impl IntoIterator<Item = (Vec<I>, Vec<I>)>,
    ) -> Result<Vec<Vec<O>>, OracleError>
    where
        I: Symbol,
        O: Output,
        T: AdaptiveMembershipOracle<I, O>,
    {
        let mut batch = Vec::new();
        let mut slots = Vec::new();

        for (prefix, suffix) in words {
            if suffix.is_empty() {
                slots.push(None);
            } else {
                slots.push(Some(batch.len()));
                batch.push(PresetQuery::new(prefix, suffix));
            }
        }

        trace!(
            batched = batch.len(),
            empty = slots.len() - batch.len(),
            "answering word queries adaptively"
        );
        self.oracle.process_queries(&mut batch)?;

        let mut answers: Vec<Option<Vec<O>>> =
            batch.into_iter().map(PresetQuery::into_answer).collect();

        Ok(slots
            .into_iter()
            .map(|slot| match slot {
                None => Vec::new(),
                Some(index) => answers[index]
                    .take()
                    .expect("processed preset queries carry an answer"),
            })
            .collect())
    }
}

/// Suspend/resume of long-running learning setups. Only cache contents are
/// ever captured; no query-in-flight state is part of a snapshot, so
/// suspension is only valid while no batch is executing.
pub trait Resumable {
    /// The opaque snapshot type.
    type Snapshot;

    /// Captures the current state.
    fn suspend(&self) -> Self::Snapshot;

    /// Installs a previously captured state.
    fn resume(&mut self, snapshot: Self::Snapshot);
}
