//! Concurrency model (§5): a scheduler passed by reference to every
//! parallel operation. It owns threads, not data; all parallelism is
//! fork-join, and the only thing that crosses a worker boundary is whatever
//! the caller's closure captures.

use rayon::prelude::*;

/// Sequential, a dedicated `rayon` thread pool, or the process-wide
/// work-stealing pool. All three share the same `parallel_for_chunks`
/// entry point so callers don't need to match on the variant.
pub enum Scheduler {
    Sequential,
    ThreadPool(rayon::ThreadPool),
    TaskStealing,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler::Sequential
    }
}

impl Scheduler {
    pub fn thread_pool(num_threads: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .expect("failed to start thread pool");
        Scheduler::ThreadPool(pool)
    }

    pub fn task_stealing() -> Self {
        Scheduler::TaskStealing
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, Scheduler::Sequential)
    }

    /// Runs `f` once per chunk of `items`, in parallel unless the scheduler
    /// is [`Scheduler::Sequential`]. `f` must not alias writes across
    /// chunks — the solver enforces this by giving each chunk its own
    /// thread-local accumulator (§4.4, §5).
    pub fn parallel_for_chunks<T, F>(&self, items: &[T], chunk_size: usize, f: F)
    where
        T: Sync,
        F: Fn(&[T]) + Sync + Send,
    {
        let chunk_size = chunk_size.max(1);
        match self {
            Scheduler::Sequential => {
                for chunk in items.chunks(chunk_size) {
                    f(chunk);
                }
            }
            Scheduler::ThreadPool(pool) => {
                pool.install(|| {
                    items.par_chunks(chunk_size).for_each(|chunk| f(chunk));
                });
            }
            Scheduler::TaskStealing => {
                items.par_chunks(chunk_size).for_each(|chunk| f(chunk));
            }
        }
    }

    /// Number of workers available for sizing chunk counts; 1 for
    /// sequential.
    pub fn worker_count(&self) -> usize {
        match self {
            Scheduler::Sequential => 1,
            Scheduler::ThreadPool(pool) => pool.current_num_threads(),
            Scheduler::TaskStealing => rayon::current_num_threads(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sequential_visits_every_chunk() {
        let items: Vec<usize> = (0..100).collect();
        let visited = AtomicUsize::new(0);
        Scheduler::Sequential.parallel_for_chunks(&items, 10, |chunk| {
            visited.fetch_add(chunk.len(), Ordering::Relaxed);
        });
        assert_eq!(visited.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn task_stealing_visits_every_chunk() {
        let items: Vec<usize> = (0..1000).collect();
        let visited = AtomicUsize::new(0);
        Scheduler::task_stealing().parallel_for_chunks(&items, 16, |chunk| {
            visited.fetch_add(chunk.len(), Ordering::Relaxed);
        });
        assert_eq!(visited.load(Ordering::Relaxed), 1000);
    }
}
