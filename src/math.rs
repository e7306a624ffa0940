/// Alias for the set implementation used throughout the crate, so callers need
/// not care which concrete `HashSet` backs it.
pub type Set<S> = fxhash::FxHashSet<S>;

/// Alias for the map implementation used throughout the crate, so callers need
/// not care which concrete `HashMap` backs it.
pub type Map<K, V> = fxhash::FxHashMap<K, V>;
