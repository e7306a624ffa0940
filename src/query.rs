use crate::alphabet::{Output, Symbol};

/// What an [`AdaptiveQuery`] wants to happen after seeing an output symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Response {
    /// Continue the current run, the next input belongs to the same trace.
    Symbol,
    /// Restart from the initial state. The next input begins a new run for
    /// the same logical query.
    Reset,
    /// The query is fully answered, no further calls will be made.
    Finished,
}

/// A multi-step query whose next input may depend on previously observed
/// outputs.
///
/// The caller, be it the cache, a bridge or a plain delegate oracle,
/// alternates [`next_input`](AdaptiveQuery::next_input) and
/// [`process_output`](AdaptiveQuery::process_output) until the latter returns
/// [`Response::Finished`]. On [`Response::Reset`] the caller rewinds its own
/// position to the initial state; the query object is *not* reset, it is
/// expected to remember where in its own logic it stands.
///
/// Calling `next_input` after `Finished` was returned is a usage fault and
/// implementations are free to panic.
pub trait AdaptiveQuery<I, O> {
    /// The next input symbol to send.
    fn next_input(&mut self) -> I;

    /// Consumes the output observed for the previously returned input.
    fn process_output(&mut self, output: O) -> Response;
}

/// An adaptive query without any adaptivity: a fixed `prefix · suffix` input
/// word is played symbol by symbol and the outputs produced for the suffix
/// are recorded as the answer. This is the shape in which classic membership
/// queries travel through adaptive oracles.
#[derive(Clone, Debug)]
pub struct PresetQuery<I, O> {
    prefix: Vec<I>,
    suffix: Vec<I>,
    prefix_idx: usize,
    suffix_idx: usize,
    outputs: Vec<O>,
    answer: Option<Vec<O>>,
}

impl<I: Symbol, O: Output> PresetQuery<I, O> {
    /// Creates a query for the word `prefix · suffix`.
    ///
    /// Panics if `suffix` is empty: such a query would never produce an
    /// answer. Empty-suffix membership queries are answered with the empty
    /// word without touching any oracle, see
    /// [`WordOracle`](crate::oracle::WordOracle).
    pub fn new(prefix: Vec<I>, suffix: Vec<I>) -> Self {
        assert!(
            !suffix.is_empty(),
            "preset queries require a non-empty suffix"
        );
        let suffix_len = suffix.len();
        Self {
            prefix,
            suffix,
            prefix_idx: 0,
            suffix_idx: 0,
            outputs: Vec::with_capacity(suffix_len),
            answer: None,
        }
    }

    /// The recorded suffix outputs, available once the query has finished.
    pub fn answer(&self) -> Option<&[O]> {
        self.answer.as_deref()
    }

    /// Consumes the query, yielding the recorded suffix outputs.
    pub fn into_answer(self) -> Option<Vec<O>> {
        self.answer
    }
}

impl<I: Symbol, O: Output> AdaptiveQuery<I, O> for PresetQuery<I, O> {
    fn next_input(&mut self) -> I {
        if self.prefix_idx < self.prefix.len() {
            let input = self.prefix[self.prefix_idx];
            self.prefix_idx += 1;
            input
        } else if self.suffix_idx < self.suffix.len() {
            let input = self.suffix[self.suffix_idx];
            self.suffix_idx += 1;
            input
        } else {
            panic!("preset query polled past the end of its word");
        }
    }

    fn process_output(&mut self, output: O) -> Response {
        if self.suffix_idx > 0 {
            self.outputs.push(output);

            if self.suffix_idx >= self.suffix.len() {
                self.answer = Some(std::mem::take(&mut self.outputs));
                return Response::Finished;
            }
        }
        Response::Symbol
    }
}
