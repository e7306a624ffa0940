use std::collections::VecDeque;

use tracing::trace;

use crate::alphabet::{Output, Symbol};
use crate::math;
use crate::mealy::{MealyMachine, StateIndex, Transducer};

/// Searches breadth-first for a shortest input word over `symbols` on which
/// `cache` and `hypothesis` disagree: either their outputs differ, or the
/// hypothesis is undefined where the cache has recorded a transition.
///
/// The cache is partial, so transitions it has not recorded are skipped; they
/// cannot testify against the hypothesis. On success the word is returned
/// together with the cache's outputs on it.
pub fn find_separating_word<I, O, H>(
    cache: &MealyMachine<I, O>,
    hypothesis: &H,
    symbols: &[I],
) -> Option<(Vec<I>, Vec<O>)>
where
    I: Symbol,
    O: Output,
    H: Transducer<I, O>,
{
    let start = (cache.initial(), hypothesis.initial_state());

    let mut predecessor: math::Map<(StateIndex, H::State), ((StateIndex, H::State), I)> =
        math::Map::default();
    let mut visited: math::Set<(StateIndex, H::State)> = math::Set::default();
    visited.insert(start);

    let mut queue = VecDeque::from([start]);

    while let Some(pair) = queue.pop_front() {
        let (cache_state, hyp_state) = pair;

        for &symbol in symbols {
            let Some((cache_succ, cache_out)) = cache.transition(cache_state, symbol) else {
                continue;
            };

            match hypothesis.step(hyp_state, symbol) {
                Some((hyp_succ, hyp_out)) if hyp_out == *cache_out => {
                    let succ = (cache_succ, hyp_succ);
                    if visited.insert(succ) {
                        predecessor.insert(succ, (pair, symbol));
                        queue.push_back(succ);
                    }
                }
                _ => {
                    let word = reconstruct(&predecessor, pair, symbol);
                    trace!(len = word.len(), "found separating word");
                    let outputs = cache
                        .output_word(&word)
                        .expect("separating word is defined in the cache");
                    return Some((word, outputs));
                }
            }
        }
    }

    None
}

/// Walks the predecessor chain back to the initial pair and appends the
/// disagreeing symbol.
fn reconstruct<S: Copy + Eq + std::hash::Hash, I: Symbol>(
    predecessor: &math::Map<S, (S, I)>,
    mut pair: S,
    last: I,
) -> Vec<I> {
    let mut word = vec![last];
    while let Some(&(previous, symbol)) = predecessor.get(&pair) {
        word.push(symbol);
        pair = previous;
    }
    word.reverse();
    word
}

#[cfg(test)]
mod tests {
    use super::find_separating_word;
    use crate::alphabet::Alphabet;
    use crate::mealy::MealyMachine;

    fn chain_cache() -> MealyMachine<char, u8> {
        // a·b -> 0·1, nothing else recorded
        MealyMachine::try_from_transitions(
            Alphabet::new(['a', 'b']),
            [(0, 'a', 0, 1), (1, 'b', 1, 2)],
        )
        .unwrap()
    }

    #[test]
    fn disagreement_is_found() {
        let cache = chain_cache();
        let hypothesis: MealyMachine<char, u8> = MealyMachine::try_from_transitions(
            Alphabet::new(['a', 'b']),
            [(0, 'a', 0, 1), (1, 'b', 0, 2)],
        )
        .unwrap();

        let (word, outputs) =
            find_separating_word(&cache, &hypothesis, &['a', 'b']).expect("machines disagree");
        assert_eq!(word, vec!['a', 'b']);
        assert_eq!(outputs, vec![0, 1]);
        assert_ne!(hypothesis.output_word(&word).unwrap(), outputs);
    }

    #[test]
    fn agreement_up_to_cache_depth() {
        let cache = chain_cache();
        let hypothesis: MealyMachine<char, u8> = MealyMachine::try_from_transitions(
            Alphabet::new(['a', 'b']),
            [
                (0, 'a', 0, 1),
                (0, 'b', 1, 0),
                (1, 'a', 1, 1),
                (1, 'b', 1, 2),
                (2, 'a', 0, 2),
                (2, 'b', 0, 2),
            ],
        )
        .unwrap();

        assert_eq!(find_separating_word(&cache, &hypothesis, &['a', 'b']), None);
    }

    #[test]
    fn undefined_hypothesis_transition_testifies() {
        let cache = chain_cache();
        let hypothesis: MealyMachine<char, u8> =
            MealyMachine::try_from_transitions(Alphabet::new(['a', 'b']), [(0, 'a', 0, 1)])
                .unwrap();

        let (word, outputs) =
            find_separating_word(&cache, &hypothesis, &['a', 'b']).expect("hypothesis is partial");
        assert_eq!(word, vec!['a', 'b']);
        assert_eq!(outputs, vec![0, 1]);
        assert_eq!(hypothesis.output_word(&word), None);
    }
}
