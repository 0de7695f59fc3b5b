//! Per-scaffold parallel processing using Rayon.
//!
//! Scaffolds are independent units of work. Results always come back in
//! lexicographic scaffold order, whether or not the work ran in parallel.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Minimum number of records before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Group items by scaffold, preserving input order within each group.
pub fn group_by_scaffold<T, F>(items: Vec<T>, scaffold_of: F) -> FxHashMap<String, Vec<T>>
where
    F: Fn(&T) -> &str,
{
    let mut groups: FxHashMap<String, Vec<T>> = FxHashMap::default();

    for item in items {
        match groups.get_mut(scaffold_of(&item)) {
            Some(group) => group.push(item),
            None => {
                let key = scaffold_of(&item).to_string();
                groups.insert(key, vec![item]);
            }
        }
    }

    groups
}

/// Sort grouped work by scaffold name.
pub fn sorted_groups<T>(groups: FxHashMap<String, T>) -> Vec<(String, T)> {
    let mut sorted: Vec<(String, T)> = groups.into_iter().collect();
    sorted.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    sorted
}

/// Apply `f` to every scaffold group, returning results in scaffold order.
pub fn process_scaffolds<T, U, F>(
    groups: FxHashMap<String, T>,
    parallel: bool,
    f: F,
) -> Vec<(String, U)>
where
    T: Send,
    U: Send,
    F: Fn(&str, T) -> U + Sync + Send,
{
    let sorted = sorted_groups(groups);

    if parallel {
        // Indexed parallel iterators keep their input order on collect
        sorted
            .into_par_iter()
            .map(|(scaffold, work)| {
                let result = f(&scaffold, work);
                (scaffold, result)
            })
            .collect()
    } else {
        sorted
            .into_iter()
            .map(|(scaffold, work)| {
                let result = f(&scaffold, work);
                (scaffold, result)
            })
            .collect()
    }
}

/// Statistics for parallel work distribution.
#[derive(Debug, Clone)]
pub struct ParallelStats {
    pub total_records: usize,
    pub num_scaffolds: usize,
    /// Largest groups first.
    pub records_per_scaffold: Vec<(String, usize)>,
}

impl ParallelStats {
    pub fn from_sizes<'a, I>(sizes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let mut records_per_scaffold: Vec<(String, usize)> = sizes
            .into_iter()
            .map(|(scaffold, n)| (scaffold.to_string(), n))
            .collect();
        records_per_scaffold.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            total_records: records_per_scaffold.iter().map(|(_, n)| n).sum(),
            num_scaffolds: records_per_scaffold.len(),
            records_per_scaffold,
        }
    }

    /// Whether the workload is large enough to run in parallel.
    pub fn is_parallel(&self) -> bool {
        self.total_records >= PARALLEL_THRESHOLD && self.num_scaffolds > 1
    }
}
