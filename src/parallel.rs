use std::thread;

use tracing::debug;

use crate::error::OracleError;
use crate::oracle::AdaptiveMembershipOracle;
use crate::query::AdaptiveQuery;

/// Smallest number of queries a worker is handed in one go. Splitting finer
/// than this wastes more time on coordination than on queries.
pub const DEFAULT_MIN_BATCH_SIZE: usize = 1;

fn default_pool_size() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

fn join_workers<'scope, T>(
    handles: Vec<thread::ScopedJoinHandle<'scope, Result<T, OracleError>>>,
) -> Result<(), OracleError> {
    let mut first_error = None;
    for handle in handles {
        match handle.join() {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => first_error = first_error.or(Some(err)),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
    match first_error {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Fans batches out over a fixed collection of independent oracle instances.
///
/// Each instance owns its private state (typically its own SUL handle); a
/// batch is partitioned into at most one contiguous slice per instance, so no
/// two workers ever share mutable state. The partition honors the configured
/// minimum batch size: small batches occupy fewer instances rather than being
/// shredded into per-query slivers.
#[derive(Clone, Debug)]
pub struct StaticParallelOracle<M> {
    oracles: Vec<M>,
    min_batch_size: usize,
}

impl<M> StaticParallelOracle<M> {
    /// Creates a pool from pre-constructed oracle instances.
    ///
    /// Panics if `oracles` is empty.
    pub fn new(oracles: Vec<M>) -> Self {
        assert!(!oracles.is_empty(), "parallel oracle needs an instance");
        Self {
            oracles,
            min_batch_size: DEFAULT_MIN_BATCH_SIZE,
        }
    }

    /// Creates a pool of `count` instances drawn from `supplier`.
    pub fn with_supplier(mut supplier: impl FnMut() -> M, count: usize) -> Self {
        Self::new((0..count).map(|_| supplier()).collect())
    }

    /// Sets the minimum number of queries a single worker is handed.
    ///
    /// Panics if `size` is zero.
    pub fn with_min_batch_size(mut self, size: usize) -> Self {
        assert!(size > 0, "minimum batch size must be positive");
        self.min_batch_size = size;
        self
    }

    /// The number of oracle instances in the pool.
    pub fn size(&self) -> usize {
        self.oracles.len()
    }
}

impl<I, O, M> AdaptiveMembershipOracle<I, O> for StaticParallelOracle<M>
where
    M: AdaptiveMembershipOracle<I, O> + Send,
{
    fn process_queries<Q>(&mut self, queries: &mut [Q]) -> Result<(), OracleError>
    where
        Q: AdaptiveQuery<I, O> + Send,
    {
        if queries.is_empty() {
            return Ok(());
        }

        let wanted = queries.len().div_ceil(self.min_batch_size);
        let workers = wanted.clamp(1, self.oracles.len());

        if workers == 1 {
            return self.oracles[0].process_queries(queries);
        }

        let chunk = queries.len().div_ceil(workers);
        debug!(
            batch = queries.len(),
            workers, chunk, "partitioning batch over static pool"
        );

        thread::scope(|scope| {
            let handles = queries
                .chunks_mut(chunk)
                .zip(self.oracles.iter_mut())
                .map(|(slice, oracle)| scope.spawn(move || oracle.process_queries(slice)))
                .collect();
            join_workers(handles)
        })
    }
}

/// Fans batches out over workers created on demand from an oracle supplier.
///
/// The batch is cut into fixed-size chunks that are fed through a shared
/// queue; up to the configured pool size, just enough workers are spawned to
/// drain it, each lazily constructing its own private oracle instance. Idle
/// workers pull more work instead of being assigned a fixed share, which
/// balances the load when queries have uneven cost.
#[derive(Clone, Debug)]
pub struct DynamicParallelOracle<F> {
    supplier: F,
    pool_size: usize,
    batch_size: usize,
}

impl<F> DynamicParallelOracle<F> {
    /// Creates a pool that constructs oracle instances through `supplier`,
    /// bounded by the available parallelism.
    pub fn new(supplier: F) -> Self {
        Self {
            supplier,
            pool_size: default_pool_size(),
            batch_size: DEFAULT_MIN_BATCH_SIZE,
        }
    }

    /// Bounds the number of concurrently running workers.
    ///
    /// Panics if `size` is zero.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        assert!(size > 0, "pool size must be positive");
        self.pool_size = size;
        self
    }

    /// Sets the number of queries a worker pulls from the queue in one go.
    ///
    /// Panics if `size` is zero.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        assert!(size > 0, "batch size must be positive");
        self.batch_size = size;
        self
    }
}

impl<I, O, M, F> AdaptiveMembershipOracle<I, O> for DynamicParallelOracle<F>
where
    M: AdaptiveMembershipOracle<I, O>,
    F: Fn() -> M + Sync,
{
    fn process_queries<Q>(&mut self, queries: &mut [Q]) -> Result<(), OracleError>
    where
        Q: AdaptiveQuery<I, O> + Send,
    {
        if queries.is_empty() {
            return Ok(());
        }

        let chunks = queries.len().div_ceil(self.batch_size);
        let workers = chunks.clamp(1, self.pool_size);

        if workers == 1 {
            return (self.supplier)().process_queries(queries);
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        for chunk in queries.chunks_mut(self.batch_size) {
            sender.send(chunk).expect("queue outlives the send loop");
        }
        // close the queue so workers stop once it is drained
        drop(sender);

        debug!(chunks, workers, "draining shared queue with dynamic pool");

        thread::scope(|scope| {
            let handles = (0..workers)
                .map(|_| {
                    let receiver = receiver.clone();
                    let supplier = &self.supplier;
                    scope.spawn(move || -> Result<(), OracleError> {
                        let mut oracle = supplier();
                        while let Ok(chunk) = receiver.recv() {
                            oracle.process_queries(chunk)?;
                        }
                        Ok(())
                    })
                })
                .collect();
            join_workers(handles)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DynamicParallelOracle, StaticParallelOracle};
    use crate::oracle::{AdaptiveMembershipOracle, SulOracle};
    use crate::query::PresetQuery;
    use crate::testing::{three_state_machine, MealySul};

    fn batch() -> Vec<PresetQuery<char, u8>> {
        let words: [&[char]; 7] = [
            &['a'],
            &['b'],
            &['a', 'a'],
            &['a', 'b', 'a'],
            &['b', 'b', 'a', 'a'],
            &['a', 'a', 'a', 'b'],
            &['b', 'a'],
        ];
        words
            .iter()
            .map(|w| PresetQuery::new(vec![], w.to_vec()))
            .collect()
    }

    fn answers(queries: Vec<PresetQuery<char, u8>>) -> Vec<Vec<u8>> {
        let mut out: Vec<Vec<u8>> = queries
            .into_iter()
            .map(|q| q.into_answer().expect("query finished"))
            .collect();
        out.sort();
        out
    }

    #[test_log::test]
    fn pools_agree_with_direct_execution() {
        let mut direct = SulOracle::new(MealySul::new(three_state_machine()));
        let mut serial = batch();
        direct.process_queries(&mut serial).unwrap();

        let mut static_pool = StaticParallelOracle::with_supplier(
            || SulOracle::new(MealySul::new(three_state_machine())),
            3,
        );
        let mut static_batch = batch();
        static_pool.process_queries(&mut static_batch).unwrap();

        let mut dynamic_pool =
            DynamicParallelOracle::new(|| SulOracle::new(MealySul::new(three_state_machine())))
                .with_pool_size(3)
                .with_batch_size(2);
        let mut dynamic_batch = batch();
        dynamic_pool.process_queries(&mut dynamic_batch).unwrap();

        let expected = answers(serial);
        assert_eq!(answers(static_batch), expected);
        assert_eq!(answers(dynamic_batch), expected);
    }

    #[test]
    fn small_batches_stay_on_one_worker() {
        let mut pool = StaticParallelOracle::with_supplier(
            || SulOracle::new(MealySul::new(three_state_machine())),
            4,
        )
        .with_min_batch_size(16);

        let mut queries = vec![PresetQuery::<char, u8>::new(vec![], vec!['a', 'b'])];
        pool.process_queries(&mut queries).unwrap();
        assert_eq!(
            queries[0].answer().unwrap(),
            &three_state_machine().output_word(&['a', 'b']).unwrap()[..]
        );
    }
}
