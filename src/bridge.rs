use tracing::trace;

use crate::alphabet::{Alphabet, Output, Symbol};
use crate::error::OracleError;
use crate::mealy::{MealyMachine, StateIndex};
use crate::oracle::{AdaptiveMembershipOracle, Sul};
use crate::query::{AdaptiveQuery, Response};

/// A single-stream cache front: hides an observation tree behind the plain
/// adaptive-oracle interface.
///
/// The bridge keeps one rolling pointer into the tree plus the literal trace
/// issued since the last reset. As long as the tree knows the requested
/// transitions, symbols are answered without touching the system under
/// learning. On the first miss the recorded trace is replayed through the SUL
/// to bring its physical state in sync, and from then on the current segment
/// is answered by the SUL directly, with every observation merged into the
/// tree. A reset costs nothing while the trace is intact: the pointer simply
/// returns to the root.
///
/// Unlike [`AdaptiveQueryCache`](crate::cache::AdaptiveQueryCache), the
/// bridge serves exactly one logical stream at a time and keeps no
/// reset-continuation bookkeeping.
#[derive(Clone, Debug)]
pub struct ObservationTreeBridge<I: Symbol, O: Output, S> {
    tree: MealyMachine<I, O>,
    sul: S,
    caching: bool,
    current_trace: Vec<I>,
    current_state: StateIndex,
    trace_valid: bool,
}

impl<I: Symbol, O: Output, S> ObservationTreeBridge<I, O, S> {
    /// Creates a bridge with an empty observation tree over `alphabet`.
    pub fn new(alphabet: Alphabet<I>, sul: S, caching: bool) -> Self {
        Self::with_tree(MealyMachine::new(alphabet), sul, caching)
    }

    /// Creates a bridge over a pre-populated observation tree.
    pub fn with_tree(tree: MealyMachine<I, O>, sul: S, caching: bool) -> Self {
        let current_state = tree.initial();
        Self {
            tree,
            sul,
            caching,
            current_trace: Vec::new(),
            current_state,
            trace_valid: caching,
        }
    }

    /// Read-only access to the observation tree.
    pub fn tree(&self) -> &MealyMachine<I, O> {
        &self.tree
    }

    /// Consumes the bridge, handing back tree and SUL.
    pub fn into_parts(self) -> (MealyMachine<I, O>, S) {
        (self.tree, self.sul)
    }
}

impl<I: Symbol, O: Output, S: Sul<I, O>> ObservationTreeBridge<I, O, S> {
    fn answer_symbol(&mut self, input: I) -> Result<O, OracleError> {
        if self.trace_valid {
            if let Some((target, output)) = self.tree.transition(self.current_state, input) {
                let output = output.clone();
                self.current_trace.push(input);
                self.current_state = target;
                return Ok(output);
            }

            // first divergence: sync the physical SUL state by replaying
            // everything issued since the last reset
            trace!(
                replay = self.current_trace.len(),
                "observation tree diverged, replaying trace"
            );
            self.trace_valid = false;
            self.sul.reset().map_err(OracleError::delegate)?;
            for &symbol in &self.current_trace {
                self.sul.step(symbol).map_err(OracleError::delegate)?;
            }
        }

        let output = self.sul.step(input).map_err(OracleError::delegate)?;

        let existing = self
            .tree
            .transition(self.current_state, input)
            .map(|(target, recorded)| (target, recorded.clone()));
        self.current_state = match existing {
            Some((target, recorded)) => {
                if recorded != output {
                    return Err(OracleError::inconsistent(input, recorded, output));
                }
                target
            }
            None => {
                let target = self.tree.add_state();
                if self.caching {
                    self.tree
                        .add_transition(self.current_state, input, target, output.clone())?;
                }
                target
            }
        };

        Ok(output)
    }

    fn reset_stream(&mut self) -> Result<(), OracleError> {
        self.current_state = self.tree.initial();

        if self.caching {
            self.current_trace.clear();
            self.trace_valid = true;
        } else {
            self.sul.reset().map_err(OracleError::delegate)?;
        }
        Ok(())
    }
}

impl<I, O, S> AdaptiveMembershipOracle<I, O> for ObservationTreeBridge<I, O, S>
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
            self.reset_stream()?;

            loop {
                let input = query.next_input();
                let output = self.answer_symbol(input)?;

                match query.process_output(output) {
                    Response::Symbol => {}
                    Response::Reset => self.reset_stream()?,
                    Response::Finished => break,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::ObservationTreeBridge;
    use crate::alphabet::Alphabet;
    use crate::oracle::AdaptiveMembershipOracle;
    use crate::query::PresetQuery;
    use crate::testing::{three_state_machine, CountingSul, MealySul};

    fn bridge(
        caching: bool,
    ) -> (
        ObservationTreeBridge<char, u8, CountingSul<MealySul>>,
        std::sync::Arc<std::sync::atomic::AtomicUsize>,
        std::sync::Arc<std::sync::atomic::AtomicUsize>,
    ) {
        let sul = CountingSul::new(MealySul::new(three_state_machine()));
        let steps = sul.steps();
        let resets = sul.resets();
        (
            ObservationTreeBridge::new(Alphabet::new(['a', 'b']), sul, caching),
            steps,
            resets,
        )
    }

    #[test_log::test]
    fn divergence_replays_the_recorded_trace() {
        let (mut bridge, steps, resets) = bridge(true);

        let mut first = vec![PresetQuery::<char, u8>::new(vec![], vec!['a', 'a'])];
        bridge.process_queries(&mut first).unwrap();
        // empty tree: one reset, two direct steps
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert_eq!(steps.load(Ordering::SeqCst), 2);

        let mut second = vec![PresetQuery::<char, u8>::new(vec![], vec!['a', 'b'])];
        bridge.process_queries(&mut second).unwrap();
        // 'a' comes from the tree; the miss on 'b' replays 'a' and asks 'b'
        assert_eq!(resets.load(Ordering::SeqCst), 2);
        assert_eq!(steps.load(Ordering::SeqCst), 4);

        let expected = three_state_machine();
        assert_eq!(
            second[0].answer().unwrap(),
            &expected.output_word(&['a', 'b']).unwrap()[..]
        );
        assert_eq!(bridge.tree().output_word(&['a', 'b']), Some(vec![0, 1]));
    }

    #[test]
    fn cached_streams_do_not_touch_the_sul() {
        let (mut bridge, steps, _) = bridge(true);

        let mut warmup = vec![PresetQuery::<char, u8>::new(vec![], vec!['a', 'b', 'a'])];
        bridge.process_queries(&mut warmup).unwrap();
        let after_warmup = steps.load(Ordering::SeqCst);

        let mut replay = vec![PresetQuery::<char, u8>::new(vec![], vec!['a', 'b'])];
        bridge.process_queries(&mut replay).unwrap();
        assert_eq!(steps.load(Ordering::SeqCst), after_warmup);
        assert_eq!(replay[0].answer().unwrap(), &[0, 1]);
    }

    #[test]
    fn disabled_cache_always_asks_the_sul() {
        let (mut bridge, steps, resets) = bridge(false);

        for _ in 0..2 {
            let mut queries = vec![PresetQuery::<char, u8>::new(vec![], vec!['a'])];
            bridge.process_queries(&mut queries).unwrap();
            assert_eq!(queries[0].answer().unwrap(), &[0]);
        }

        assert_eq!(steps.load(Ordering::SeqCst), 2);
        assert_eq!(resets.load(Ordering::SeqCst), 2);
        assert_eq!(bridge.tree().output_word(&['a']), None);
    }
}
