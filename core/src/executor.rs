//! Execution contexts.
//!
//! # Design
//! The requester never picks threads on its own. It is handed two
//! `Executor`s: a worker that runs mappings and a delivery context that runs
//! completions. Three implementations cover the usual cases:
//!
//! - `TokioExecutor` spawns jobs onto an existing runtime.
//! - `WorkerPool` owns a dedicated multi-thread runtime.
//! - `SerialQueue` holds jobs until its owner drains them, like a UI main
//!   queue; tests use it to make scheduling deterministic.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::runtime::{Handle, Runtime};

use crate::error::ExecutorError;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A scheduling target. `execute` must not run `job` inline.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs each job as a task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// The runtime of the calling thread.
    pub fn current() -> Result<Self, ExecutorError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ExecutorError::NoRuntime)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// A dedicated multi-thread runtime used as a shared worker context.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, ExecutorError> {
        Self::builder().threads(threads).build()
    }

    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::default()
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool").finish_non_exhaustive()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Blocking shutdown would panic when dropped inside another runtime.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPoolBuilder {
    threads: usize,
    thread_name: String,
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self {
            threads: 2,
            thread_name: "requester-worker".to_string(),
        }
    }
}

impl WorkerPoolBuilder {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn build(self) -> Result<WorkerPool, ExecutorError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.threads)
            .thread_name(self.thread_name)
            .build()?;
        let handle = runtime.handle().clone();
        Ok(WorkerPool {
            runtime: Some(runtime),
            handle,
        })
    }
}

/// A FIFO of jobs that only run when the owner drains the queue.
///
/// Clones share the same queue, so one clone can be handed to a requester
/// as its delivery context while the owner keeps another to drain it.
#[derive(Clone, Default)]
pub struct SerialQueue {
    inner: Arc<QueueInner>,
}

#[derive(Default)]
struct QueueInner {
    jobs: Mutex<VecDeque<Job>>,
    ready: Condvar,
}

impl SerialQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run queued jobs, including ones enqueued while draining, until empty.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(job) = self.pop() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for a job and run it. Returns whether one ran.
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut jobs = self.lock();
        loop {
            if let Some(job) = jobs.pop_front() {
                drop(jobs);
                job();
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            jobs = self
                .inner
                .ready
                .wait_timeout(jobs, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn pop(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.inner.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Executor for SerialQueue {
    fn execute(&self, job: Job) {
        self.lock().push_back(job);
        self.inner.ready.notify_one();
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue").field("pending", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn serial_queue_defers_until_drained() {
        let queue = SerialQueue::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            queue.execute(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.run_pending(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn serial_queue_runs_in_fifo_order() {
        let queue = SerialQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let order = Arc::clone(&order);
            queue.execute(Box::new(move || order.lock().unwrap().push(i)));
        }
        queue.run_pending();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn serial_queue_drains_jobs_enqueued_while_running() {
        let queue = SerialQueue::new();
        let inner = queue.clone();
        queue.execute(Box::new(move || inner.execute(Box::new(|| {}))));
        assert_eq!(queue.run_pending(), 2);
    }

    #[test]
    fn run_next_timeout_waits_for_other_threads() {
        let queue = SerialQueue::new();
        let producer = queue.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.execute(Box::new(move || tx.send(7).unwrap()));
        });
        assert!(queue.run_next_timeout(Duration::from_secs(5)));
        assert_eq!(rx.recv().unwrap(), 7);
    }

    #[test]
    fn run_next_timeout_gives_up() {
        let queue = SerialQueue::new();
        assert!(!queue.run_next_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn worker_pool_runs_jobs_on_named_threads() {
        let pool = WorkerPool::builder()
            .threads(1)
            .thread_name("mapping-worker")
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel();
        pool.execute(Box::new(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }));
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("mapping-worker"));
    }

    #[test]
    fn tokio_executor_requires_a_runtime() {
        assert!(matches!(TokioExecutor::current(), Err(ExecutorError::NoRuntime)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tokio_executor_spawns_on_current_runtime() {
        let executor = TokioExecutor::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        executor.execute(Box::new(move || {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }
}
