use std::fmt::Debug;

use itertools::Itertools;

use crate::alphabet::{Output, Symbol};

/// A finite input word together with the co-indexed outputs it produced, the
/// central unit exchanged between cache, delegate and learners.
///
/// A trace is immutable once captured from a [`TraceBuilder`], which is the
/// only way to construct one with differing input and output sources. The
/// builder enforces that both sequences have the same length.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Trace<I, O> {
    inputs: Vec<I>,
    outputs: Vec<O>,
}

impl<I: Symbol, O: Output> Trace<I, O> {
    /// Creates a trace from already co-indexed sequences.
    ///
    /// Panics if the sequences differ in length, this is a usage fault.
    pub fn from_parts(inputs: Vec<I>, outputs: Vec<O>) -> Self {
        assert_eq!(
            inputs.len(),
            outputs.len(),
            "trace inputs and outputs must be co-indexed"
        );
        Self { inputs, outputs }
    }

    /// The input word.
    pub fn inputs(&self) -> &[I] {
        &self.inputs
    }

    /// The output word.
    pub fn outputs(&self) -> &[O] {
        &self.outputs
    }

    /// The number of symbols in the trace.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True for the empty trace.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Iterates over co-indexed `(input, output)` pairs.
    pub fn steps(&self) -> impl Iterator<Item = (I, &O)> + '_ {
        self.inputs.iter().copied().zip_eq(&self.outputs)
    }

    /// Decomposes the trace into its input and output words.
    pub fn into_parts(self) -> (Vec<I>, Vec<O>) {
        (self.inputs, self.outputs)
    }
}

impl<I: Symbol, O: Output> Debug for Trace<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} / {:?}", self.inputs, self.outputs)
    }
}

/// Accumulates a trace symbol by symbol. Inputs may run ahead of outputs while
/// a query is in flight, the two sequences are reconciled when the trace is
/// [finished](TraceBuilder::finish).
#[derive(Clone, Debug)]
pub struct TraceBuilder<I, O> {
    inputs: Vec<I>,
    outputs: Vec<O>,
}

impl<I, O> Default for TraceBuilder<I, O> {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl<I: Symbol, O: Output> TraceBuilder<I, O> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder whose input word is seeded with `inputs`, as happens
    /// when a partially processed run is handed over for replay.
    pub fn with_inputs(inputs: Vec<I>) -> Self {
        Self {
            inputs,
            outputs: Vec::new(),
        }
    }

    /// Appends an input symbol.
    pub fn push_input(&mut self, input: I) {
        self.inputs.push(input);
    }

    /// Appends an output symbol.
    pub fn push_output(&mut self, output: O) {
        self.outputs.push(output);
    }

    /// The input symbol at `index`.
    pub fn input(&self, index: usize) -> I {
        self.inputs[index]
    }

    /// The number of inputs recorded so far.
    pub fn input_len(&self) -> usize {
        self.inputs.len()
    }

    /// The number of outputs recorded so far.
    pub fn output_len(&self) -> usize {
        self.outputs.len()
    }

    /// Drops everything recorded so far, e.g. after a reset.
    pub fn clear(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }

    /// Captures the accumulated trace.
    ///
    /// Panics if inputs and outputs have diverged in length, which means the
    /// query protocol was not driven to a consistent stop.
    pub fn finish(self) -> Trace<I, O> {
        Trace::from_parts(self.inputs, self.outputs)
    }
}
