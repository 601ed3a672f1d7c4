//! Shared work queue and worker pool
//!
//! A pool is just N drainers of one queue. Drainers run on a rayon pool
//! whose threads come from a `WorkerSpawner`. When that pool cannot be
//! built, the caller drains the queue itself with the same closure.

use crossbeam_channel::{Receiver, unbounded};
use rayon::{ThreadBuilder, ThreadPoolBuilder};
use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Starts pool threads. Swappable so thread-creation failure can be forced.
pub trait WorkerSpawner: Send + Sync + fmt::Debug {
    fn spawn(&self, name: String, job: Job) -> io::Result<()>;
}

/// Spawns named OS threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsThreadSpawner;

impl WorkerSpawner for OsThreadSpawner {
    fn spawn(&self, name: String, job: Job) -> io::Result<()> {
        thread::Builder::new().name(name).spawn(job)?;
        Ok(())
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// FIFO queue shared by all drainers, filled once up front.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Receiver<T>,
}

impl<T> WorkQueue<T> {
    pub fn new<I: IntoIterator<Item = T>>(items: I) -> Self {
        let (tx, rx) = unbounded();
        for item in items {
            // rx is alive, so an unbounded send cannot fail
            let _ = tx.send(item);
        }
        Self { items: rx }
    }

    pub fn pop(&self) -> Option<T> {
        self.items.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Runs `work` once on each of `count` pool threads and waits for all of them.
///
/// Returns the number of threads that ran it; 0 means the calling thread
/// drained the work itself because the pool could not be started.
pub fn run_pool<F>(spawner: &dyn WorkerSpawner, label: &str, count: usize, work: F) -> usize
where
    F: Fn() + Sync,
{
    let count = count.max(1);
    let thread_label = label.to_string();
    let pool = ThreadPoolBuilder::new()
        .num_threads(count)
        .thread_name(move |index| format!("{}-{}", thread_label, index))
        .spawn_handler(|thread: ThreadBuilder| {
            let name = thread.name().unwrap_or(label).to_string();
            spawner.spawn(name, Box::new(move || thread.run()))
        })
        .build();

    match pool {
        Ok(pool) => {
            pool.broadcast(|_| work());
            count
        }
        Err(e) => {
            tracing::warn!("No {} threads available ({}), running single-threaded", label, e);
            work();
            0
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Spawner whose thread creation always fails.
    #[derive(Debug, Default)]
    pub(crate) struct FailingSpawner;

    impl WorkerSpawner for FailingSpawner {
        fn spawn(&self, _name: String, _job: Job) -> io::Result<()> {
            Err(io::Error::other("thread creation disabled"))
        }
    }

    /// Spawner that allows a fixed number of threads, then fails.
    #[derive(Debug)]
    pub(crate) struct LimitedSpawner {
        pub remaining: AtomicUsize,
    }

    impl WorkerSpawner for LimitedSpawner {
        fn spawn(&self, name: String, job: Job) -> io::Result<()> {
            let left = self.remaining.load(Ordering::SeqCst);
            if left == 0 {
                return Err(io::Error::other("limit reached"));
            }
            self.remaining.store(left - 1, Ordering::SeqCst);
            OsThreadSpawner.spawn(name, job)
        }
    }

    /// Records thread names and spawns normally.
    #[derive(Debug, Default)]
    struct NamingSpawner {
        names: Mutex<Vec<String>>,
    }

    impl WorkerSpawner for NamingSpawner {
        fn spawn(&self, name: String, job: Job) -> io::Result<()> {
            lock(&self.names).push(name.clone());
            OsThreadSpawner.spawn(name, job)
        }
    }

    fn drain_counting(spawner: &dyn WorkerSpawner, threads: usize) -> (usize, usize) {
        let queue = WorkQueue::new(0..100);
        let sum = AtomicUsize::new(0);
        let used = run_pool(spawner, "test", threads, || {
            while let Some(n) = queue.pop() {
                sum.fetch_add(n, Ordering::SeqCst);
            }
        });
        assert!(queue.is_empty());
        (used, sum.load(Ordering::SeqCst))
    }

    #[test]
    fn test_queue_is_fifo() {
        let queue = WorkQueue::new(["a", "b", "c"]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), Some("b"));
        assert_eq!(queue.pop(), Some("c"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_pool_drains_queue() {
        let (used, sum) = drain_counting(&OsThreadSpawner, 4);
        assert_eq!(used, 4);
        assert_eq!(sum, (0..100).sum::<usize>());
    }

    #[test]
    fn test_pool_threads_come_from_spawner() {
        let spawner = NamingSpawner::default();
        let (used, _) = drain_counting(&spawner, 3);
        assert_eq!(used, 3);
        let mut names = lock(&spawner.names).clone();
        names.sort();
        assert_eq!(names, vec!["test-0", "test-1", "test-2"]);
    }

    #[test]
    fn test_pool_falls_back_to_caller_thread() {
        let (used, sum) = drain_counting(&FailingSpawner, 4);
        assert_eq!(used, 0);
        assert_eq!(sum, (0..100).sum::<usize>());
    }

    #[test]
    fn test_partial_spawn_failure_drains_on_caller() {
        let spawner = LimitedSpawner {
            remaining: AtomicUsize::new(2),
        };
        let (used, sum) = drain_counting(&spawner, 8);
        assert_eq!(used, 0);
        assert_eq!(sum, (0..100).sum::<usize>());
    }
}
