//! Parallel orchestration across queries.
//!
//! Queries are independent once their null has been built, so the
//! scheduler farms them out at one-query granularity, using a scoped
//! thread pool rather than rayon's global one.

#[cfg(feature = "parallel")]
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

/// Resolves the `n_jobs` convention (negative = all available cores) into
/// a `rayon::ThreadPoolBuilder` thread count.
fn resolve_threads(n_jobs: i64) -> Option<usize> {
    if n_jobs <= 0 {
        None // let rayon pick the default (all cores)
    } else {
        Some(n_jobs as usize)
    }
}

/// Runs `f` once per element of `items`, indexed, scheduled across `n_jobs`
/// workers. Falls back to the caller's thread when the `parallel` feature is
/// disabled or `n_jobs == 1`.
pub(crate) fn run_indexed<T, R, F>(items: &[T], n_jobs: i64, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if n_jobs != 1 {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(threads) = resolve_threads(n_jobs) {
                builder = builder.num_threads(threads);
            }
            return match builder.build() {
                Ok(pool) => pool.install(|| {
                    (0..items.len())
                        .into_par_iter()
                        .map(|i| f(i, &items[i]))
                        .collect()
                }),
                Err(err) => {
                    tracing::warn!("failed to build scoped thread pool ({err}); running serially");
                    items.iter().enumerate().map(|(i, x)| f(i, x)).collect()
                }
            };
        }
    }
    let _ = n_jobs;
    items.iter().enumerate().map(|(i, x)| f(i, x)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_indexed_preserves_order() {
        let items = vec![10, 20, 30, 40];
        let out = run_indexed(&items, -1, |i, x| i as i64 + *x as i64);
        assert_eq!(out, vec![10, 21, 32, 43]);
    }

    #[test]
    fn run_indexed_single_threaded_matches_parallel() {
        let items: Vec<i64> = (0..50).collect();
        let serial = run_indexed(&items, 1, |_, x| x * 2);
        let parallel = run_indexed(&items, -1, |_, x| x * 2);
        assert_eq!(serial, parallel);
    }
}
