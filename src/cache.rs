use std::collections::VecDeque;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::alphabet::{Alphabet, Output, Symbol};
use crate::equivalence::find_separating_word;
use crate::error::OracleError;
use crate::mealy::{MealyMachine, StateIndex, Transducer};
use crate::oracle::{AdaptiveMembershipOracle, Resumable};
use crate::query::{AdaptiveQuery, Response};
use crate::word::{Trace, TraceBuilder};

/// A prefix cache for an [`AdaptiveMembershipOracle`].
///
/// Queries that can be answered from the incrementally grown cache automaton
/// are answered directly; the rest are forwarded to the delegate oracle, and
/// every symbol observed while doing so is folded back into the automaton.
/// Repeating a query with a symbol history the cache has already seen never
/// reaches the delegate again.
///
/// Because adaptive queries are processed step-wise, duplicates *within* a
/// single batch are not deduplicated against each other's in-flight results,
/// only against the cache as it stands between delegate rounds. Maximum cache
/// efficiency requires posing queries one by one, at the price of
/// parallelism.
#[derive(Clone, Debug)]
pub struct AdaptiveQueryCache<I: Symbol, O: Output, T> {
    delegate: T,
    cache: MealyMachine<I, O>,
}

impl<I: Symbol, O: Output, T> AdaptiveQueryCache<I, O, T> {
    /// Creates an empty cache over `alphabet` in front of `delegate`.
    pub fn new(delegate: T, alphabet: Alphabet<I>) -> Self {
        Self {
            delegate,
            cache: MealyMachine::new(alphabet),
        }
    }

    /// Read-only access to the cache automaton.
    pub fn cache(&self) -> &MealyMachine<I, O> {
        &self.cache
    }

    /// Consumes the cache, handing back the delegate oracle.
    pub fn into_delegate(self) -> T {
        self.delegate
    }

    /// Inserts an observed trace starting at the initial state, returning the
    /// state reached after it.
    pub fn insert(&mut self, trace: &Trace<I, O>) -> Result<StateIndex, OracleError> {
        self.insert_from(self.cache.initial(), trace.inputs(), trace.outputs())
    }

    /// Inserts a co-indexed input/output sequence starting at `state`,
    /// following existing transitions and creating missing ones. The returned
    /// state allows chaining insertions across reset-delimited runs.
    ///
    /// An existing transition whose recorded output differs from the one being
    /// inserted is a fatal consistency fault: the target is non-deterministic
    /// or its reset is broken. Nothing is ever overwritten.
    pub fn insert_from(
        &mut self,
        state: StateIndex,
        inputs: &[I],
        outputs: &[O],
    ) -> Result<StateIndex, OracleError> {
        let mut current = state;

        for (&input, output) in inputs.iter().zip_eq(outputs) {
            current = match self.cache.transition(current, input) {
                Some((target, recorded)) => {
                    if recorded != output {
                        return Err(OracleError::inconsistent(input, recorded, output));
                    }
                    target
                }
                None => {
                    let target = self.cache.add_state();
                    self.cache
                        .add_transition(current, input, target, output.clone())?;
                    target
                }
            };
        }
        Ok(current)
    }

    /// Announces a new input symbol. Must only be called between batches.
    pub fn add_alphabet_symbol(&mut self, symbol: I) {
        self.cache.add_alphabet_symbol(symbol);
    }

    /// Searches for an input word over `symbols` on which the cache automaton
    /// and `hypothesis` disagree. If one is found it is returned together with
    /// the cache's outputs on it, ready to be used as a counterexample.
    ///
    /// `None` does not prove equivalence, it only means the cache holds no
    /// disagreement with the hypothesis so far. Transitions the cache has not
    /// recorded yet cannot testify against anything and are skipped.
    pub fn find_counterexample<H>(&self, hypothesis: &H, symbols: &[I]) -> Option<(Vec<I>, Vec<O>)>
    where
        H: Transducer<I, O>,
    {
        find_separating_word(&self.cache, hypothesis, symbols)
    }
}

impl<I, O, T> AdaptiveMembershipOracle<I, O> for AdaptiveQueryCache<I, O, T>
where
    I: Symbol,
    O: Output,
    T: AdaptiveMembershipOracle<I, O>,
{
    fn process_queries<Q>(&mut self, queries: &mut [Q]) -> Result<(), OracleError>
    where
        Q: AdaptiveQuery<I, O> + Send,
    {
        let mut queue: VecDeque<&mut Q> = queries.iter_mut().collect();
        let mut unanswered: Vec<TrackingQuery<'_, Q, I, O>> = Vec::with_capacity(queue.len());

        while !queue.is_empty() {
            // answer whatever the automaton already knows
            'cache: while let Some(query) = queue.pop_front() {
                let mut run = Vec::new();
                let mut current = self.cache.initial();

                loop {
                    let input = query.next_input();
                    run.push(input);

                    let Some((target, output)) = self.cache.transition(current, input) else {
                        unanswered.push(TrackingQuery::new(query, run));
                        continue 'cache;
                    };
                    let output = output.clone();

                    match query.process_output(output) {
                        Response::Symbol => current = target,
                        Response::Reset => {
                            current = self.cache.initial();
                            run.clear();
                        }
                        Response::Finished => break,
                    }
                }
            }

            if unanswered.is_empty() {
                break;
            }
            debug!(escalated = unanswered.len(), "delegating cache misses");
            self.delegate.process_queries(&mut unanswered)?;

            // feed the delegate's answers back into the automaton; queries
            // stopped by a reset retry against the now-larger cache
            for tracked in unanswered.drain(..) {
                let (query, trace, finished) = tracked.into_parts();
                trace!(len = trace.len(), finished, "inserting delegated trace");
                self.insert(&trace)?;

                if !finished {
                    queue.push_back(query);
                }
            }
        }
        Ok(())
    }
}

/// An opaque, serializable capture of the cache automaton, sufficient to
/// reconstruct an equivalent cache later. No in-flight query state is part of
/// a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot<I: Symbol, O: Output> {
    cache: MealyMachine<I, O>,
}

impl<I: Symbol, O: Output, T> Resumable for AdaptiveQueryCache<I, O, T> {
    type Snapshot = CacheSnapshot<I, O>;

    fn suspend(&self) -> CacheSnapshot<I, O> {
        CacheSnapshot {
            cache: self.cache.clone(),
        }
    }

    fn resume(&mut self, snapshot: CacheSnapshot<I, O>) {
        self.cache = snapshot.cache;
    }
}

/// Decorates an escalated query for the delegate round: the input prefix
/// consumed during the failed cache walk is replayed verbatim (its outputs
/// are withheld from the underlying query, which has already seen all but the
/// last of them), then control passes to the underlying query's own logic.
/// Every input/output pair that flows through is recorded for insertion.
///
/// A reset requested by the underlying query ends the delegate round for it:
/// the tracking query reports `Finished`, and the continuation is re-queued
/// as a fresh cache attempt.
struct TrackingQuery<'a, Q, I, O> {
    delegate: &'a mut Q,
    trace: TraceBuilder<I, O>,
    prefix_len: usize,
    prefix_idx: usize,
    finished: bool,
}

impl<'a, Q, I: Symbol, O: Output> TrackingQuery<'a, Q, I, O> {
    fn new(delegate: &'a mut Q, replay: Vec<I>) -> Self {
        Self {
            delegate,
            prefix_len: replay.len(),
            trace: TraceBuilder::with_inputs(replay),
            prefix_idx: 0,
            finished: false,
        }
    }

    fn into_parts(self) -> (&'a mut Q, Trace<I, O>, bool) {
        (self.delegate, self.trace.finish(), self.finished)
    }
}

impl<'a, Q, I, O> AdaptiveQuery<I, O> for TrackingQuery<'a, Q, I, O>
where
    Q: AdaptiveQuery<I, O>,
    I: Symbol,
    O: Output,
{
    fn next_input(&mut self) -> I {
        // still replaying the backlog
        if self.prefix_idx < self.prefix_len {
            return self.trace.input(self.prefix_idx);
        }

        let input = self.delegate.next_input();
        self.trace.push_input(input);
        input
    }

    fn process_output(&mut self, output: O) -> Response {
        self.trace.push_output(output.clone());
        self.prefix_idx += 1;

        // the underlying query only awaits the output of the last backlog
        // symbol, everything before it was answered during the cache walk
        if self.prefix_idx < self.prefix_len {
            return Response::Symbol;
        }

        match self.delegate.process_output(output) {
            Response::Finished => {
                self.finished = true;
                Response::Finished
            }
            Response::Reset => Response::Finished,
            Response::Symbol => Response::Symbol,
        }
    }
}
