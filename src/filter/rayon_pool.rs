//! Rayon pool for the join and sort phases.
//!
//! Those phases run once the scan threads have exited, so the pool gets every
//! core. Inputs below `PARALLEL_MIN_LEN` stay on the calling thread; a typical
//! run keeps only a few thousand candidates.

use once_cell::sync::Lazy;
use rayon::{ThreadPool, ThreadPoolBuilder};

pub const THREADS_ENV: &str = "SHARD_FINDER_RAYON_THREADS";

/// Smallest input handed to the pool.
pub const PARALLEL_MIN_LEN: usize = 4_096;

static FINALIZE_POOL: Lazy<Option<ThreadPool>> = Lazy::new(|| {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    let threads = thread_count(std::env::var(THREADS_ENV).ok().as_deref(), cores);
    match ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("shard-finalize-{}", i))
        .build()
    {
        Ok(pool) => {
            log::debug!("finalize pool started with {} threads", threads);
            Some(pool)
        }
        Err(e) => {
            log::warn!("finalize pool unavailable ({}); using the global rayon pool", e);
            None
        }
    }
});

/// A positive override wins; anything else falls back to `cores`.
fn thread_count(override_var: Option<&str>, cores: usize) -> usize {
    override_var
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(cores)
}

pub fn worth_parallel(len: usize) -> bool {
    len >= PARALLEL_MIN_LEN
}

/// Run `f` inside the finalize pool, or inline when the pool could not be built.
pub fn install<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match FINALIZE_POOL.as_ref() {
        Some(pool) => pool.install(f),
        None => f(),
    }
}
