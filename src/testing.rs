//! Shared fixtures for the crate's tests: machine-backed and instrumented
//! systems under learning.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::alphabet::Alphabet;
use crate::mealy::{MealyMachine, StateIndex};
use crate::oracle::Sul;

/// A deterministic SUL backed by a total Mealy machine.
#[derive(Clone, Debug)]
pub(crate) struct MealySul {
    machine: MealyMachine<char, u8>,
    current: StateIndex,
}

impl MealySul {
    pub(crate) fn new(machine: MealyMachine<char, u8>) -> Self {
        let current = machine.initial();
        Self { machine, current }
    }
}

impl Sul<char, u8> for MealySul {
    type Error = Infallible;

    fn reset(&mut self) -> Result<(), Infallible> {
        self.current = self.machine.initial();
        Ok(())
    }

    fn step(&mut self, input: char) -> Result<u8, Infallible> {
        let (target, output) = self
            .machine
            .transition(self.current, input)
            .expect("test machine must be total");
        self.current = target;
        Ok(*output)
    }
}

/// Wraps a SUL and counts resets and steps, so tests can assert how often the
/// delegate was actually consulted.
#[derive(Clone, Debug)]
pub(crate) struct CountingSul<S> {
    inner: S,
    steps: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl<S> CountingSul<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            steps: Arc::new(AtomicUsize::new(0)),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn steps(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.steps)
    }

    pub(crate) fn resets(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }
}

impl<I, O, S: Sul<I, O>> Sul<I, O> for CountingSul<S> {
    type Error = S::Error;

    fn reset(&mut self) -> Result<(), S::Error> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.inner.reset()
    }

    fn step(&mut self, input: I) -> Result<O, S::Error> {
        self.steps.fetch_add(1, Ordering::SeqCst);
        self.inner.step(input)
    }
}

/// A SUL that fails after a fixed number of steps, for delegate-fault tests.
#[derive(Debug)]
pub(crate) struct FailingSul {
    remaining: usize,
}

impl FailingSul {
    pub(crate) fn after(steps: usize) -> Self {
        Self { remaining: steps }
    }
}

impl Sul<char, u8> for FailingSul {
    type Error = std::io::Error;

    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn step(&mut self, _input: char) -> Result<u8, Self::Error> {
        if self.remaining == 0 {
            return Err(std::io::Error::other("target hung up"));
        }
        self.remaining -= 1;
        Ok(0)
    }
}

/// A total three-state machine over `{a, b}` used as the standard learning
/// target in tests.
pub(crate) fn three_state_machine() -> MealyMachine<char, u8> {
    MealyMachine::try_from_transitions(
        Alphabet::new(['a', 'b']),
        [
            (0, 'a', 0, 1),
            (0, 'b', 1, 0),
            (1, 'a', 0, 2),
            (1, 'b', 1, 1),
            (2, 'a', 1, 0),
            (2, 'b', 0, 2),
        ],
    )
    .expect("fixture machine is consistent")
}
