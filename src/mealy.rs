use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, Output, Symbol};
use crate::error::OracleError;

/// Stable identifier of a state in a [`MealyMachine`]. States are stored in an
/// arena and addressed by index, so back-references are plain lookups.
pub type StateIndex = u32;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct MealyTransition<O> {
    target: StateIndex,
    output: O,
}

/// Per-state transition slots, indexed by the position of the input symbol in
/// the alphabet. The vector is grown lazily, so states created before an
/// alphabet extension simply have undefined transitions on the new symbols.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct MealyState<O> {
    transitions: Vec<Option<MealyTransition<O>>>,
}

impl<O> MealyState<O> {
    fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    fn slot(&self, position: usize) -> Option<&MealyTransition<O>> {
        self.transitions.get(position).and_then(Option::as_ref)
    }
}

/// A deterministic Mealy machine with append-only arena storage.
///
/// This is the shared shape behind the query cache, the observation tree of
/// the [bridge](crate::bridge::ObservationTreeBridge) and learned hypotheses.
/// Every state has at most one outgoing transition per input symbol, each
/// carrying an output and a successor. States and transitions are never
/// removed or relabeled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealyMachine<I: Symbol, O: Output> {
    alphabet: Alphabet<I>,
    states: Vec<MealyState<O>>,
    initial: StateIndex,
}

impl<I: Symbol, O: Output> MealyMachine<I, O> {
    /// Creates a machine over `alphabet` containing only the initial state.
    pub fn new(alphabet: Alphabet<I>) -> Self {
        Self {
            alphabet,
            states: vec![MealyState::new()],
            initial: 0,
        }
    }

    /// Creates a machine from explicit transitions in the form
    /// `(source, input, output, target)`, the initial state being `0`. States
    /// are created as needed. Useful for building hypotheses by hand.
    pub fn try_from_transitions<It>(alphabet: Alphabet<I>, edges: It) -> Result<Self, OracleError>
    where
        It: IntoIterator<Item = (StateIndex, I, O, StateIndex)>,
    {
        let mut machine = Self::new(alphabet);
        for (source, input, output, target) in edges {
            let needed = source.max(target) as usize + 1;
            while machine.states.len() < needed {
                machine.add_state();
            }
            match machine.transition(source, input) {
                Some((succ, recorded)) if succ == target && *recorded == output => {}
                Some((_, recorded)) => {
                    return Err(OracleError::inconsistent(input, recorded, &output))
                }
                None => machine.add_transition(source, input, target, output)?,
            }
        }
        Ok(machine)
    }

    /// The input alphabet.
    pub fn alphabet(&self) -> &Alphabet<I> {
        &self.alphabet
    }

    /// The distinguished initial state.
    pub fn initial(&self) -> StateIndex {
        self.initial
    }

    /// The number of states in the arena.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Adds a fresh state without any transitions.
    pub fn add_state(&mut self) -> StateIndex {
        let index = self.states.len() as StateIndex;
        self.states.push(MealyState::new());
        index
    }

    /// Adds `symbol` to the alphabet, returning its position. Existing states
    /// are untouched, their transition slots grow on demand.
    pub fn add_alphabet_symbol(&mut self, symbol: I) -> usize {
        self.alphabet.add_symbol(symbol)
    }

    /// The successor and output for taking `input` in `state`, or `None` if no
    /// such transition has been recorded (or the symbol is unknown).
    pub fn transition(&self, state: StateIndex, input: I) -> Option<(StateIndex, &O)> {
        let position = self.alphabet.position(input)?;
        self.states[state as usize]
            .slot(position)
            .map(|t| (t.target, &t.output))
    }

    /// Records the transition `source --input/output--> target`.
    ///
    /// The slot must be undefined, recorded transitions are never overwritten.
    /// Callers that may see an existing slot check it for consistency first.
    pub fn add_transition(
        &mut self,
        source: StateIndex,
        input: I,
        target: StateIndex,
        output: O,
    ) -> Result<(), OracleError> {
        let Some(position) = self.alphabet.position(input) else {
            return Err(OracleError::unknown_symbol(input));
        };
        let state = &mut self.states[source as usize];
        if state.transitions.len() <= position {
            state.transitions.resize_with(position + 1, || None);
        }
        debug_assert!(
            state.transitions[position].is_none(),
            "transitions are append-only"
        );
        state.transitions[position] = Some(MealyTransition { target, output });
        Ok(())
    }

    /// Runs `word` from the initial state, returning the produced output word
    /// or `None` as soon as an undefined transition is hit.
    pub fn output_word(&self, word: &[I]) -> Option<Vec<O>> {
        let mut current = self.initial;
        let mut outputs = Vec::with_capacity(word.len());
        for &input in word {
            let (target, output) = self.transition(current, input)?;
            outputs.push(output.clone());
            current = target;
        }
        Some(outputs)
    }
}

/// Read-only view of a deterministic transducer. This is the seam through
/// which learner-built hypotheses are handed to the
/// [consistency check](crate::cache::AdaptiveQueryCache::find_counterexample),
/// no matter how the learner represents them internally.
pub trait Transducer<I, O> {
    /// The state identifier of the hypothesis representation.
    type State: Copy + Eq + Hash;

    /// The state in which every run starts.
    fn initial_state(&self) -> Self::State;

    /// Takes `input` in `state`, returning successor and output, or `None` if
    /// the transducer leaves this transition undefined.
    fn step(&self, state: Self::State, input: I) -> Option<(Self::State, O)>;
}

impl<I: Symbol, O: Output> Transducer<I, O> for MealyMachine<I, O> {
    type State = StateIndex;

    fn initial_state(&self) -> StateIndex {
        self.initial
    }

    fn step(&self, state: StateIndex, input: I) -> Option<(StateIndex, O)> {
        self.transition(state, input)
            .map(|(target, output)| (target, output.clone()))
    }
}

impl<I, O, T: Transducer<I, O>> Transducer<I, O> for &T {
    type State = T::State;

    fn initial_state(&self) -> Self::State {
        T::initial_state(self)
    }

    fn step(&self, state: Self::State, input: I) -> Option<(Self::State, O)> {
        T::step(self, state, input)
    }
}

#[cfg(test)]
mod tests {
    use super::MealyMachine;
    use crate::alphabet::Alphabet;

    #[test]
    fn build_and_run() {
        let machine: MealyMachine<char, u8> = MealyMachine::try_from_transitions(
            Alphabet::new(['a', 'b']),
            [(0, 'a', 1, 1), (0, 'b', 0, 0), (1, 'a', 0, 1), (1, 'b', 1, 0)],
        )
        .unwrap();

        assert_eq!(machine.size(), 2);
        assert_eq!(machine.output_word(&['a', 'a', 'b']), Some(vec![1, 0, 1]));
        assert_eq!(machine.output_word(&['a', 'c']), None);
    }

    #[test]
    fn conflicting_transitions_are_rejected() {
        let result: Result<MealyMachine<char, u8>, _> = MealyMachine::try_from_transitions(
            Alphabet::new(['a']),
            [(0, 'a', 1, 1), (0, 'a', 2, 1)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn alphabet_growth_is_lazy() {
        let mut machine: MealyMachine<char, u8> =
            MealyMachine::try_from_transitions(Alphabet::new(['a']), [(0, 'a', 1, 0)]).unwrap();

        machine.add_alphabet_symbol('b');
        assert_eq!(machine.transition(0, 'b'), None);

        machine.add_transition(0, 'b', 0, 7).unwrap();
        assert_eq!(machine.output_word(&['b', 'a']), Some(vec![7, 1]));
    }
}
