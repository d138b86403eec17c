use super::job::Job;
use super::panic_handler::PanicHandler;
use super::sleep::Sleep;
use super::worker::{WorkerId, WorkerStats, WorkerThread};
use crate::config::{Config, StealPolicy};
use crate::error::{Error, Result};
use crate::task::{ForkJoinTask, RecursiveAction, RecursiveTask};
use crate::util::CachePadded;
use crossbeam_deque::{Injector, Stealer, Worker as WorkerQueue};
use parking_lot::Mutex;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[cfg(target_os = "linux")]
fn pin_thread_to_core(core_id: usize) {
    unsafe {
        let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core_id, &mut cpuset);
        let result = libc::sched_setaffinity(
            0, // current thread
            std::mem::size_of::<libc::cpu_set_t>(),
            &cpuset,
        );
        if result != 0 {
            tracing::warn!(
                thread = std::thread::current().name().unwrap_or("unknown"),
                core = core_id,
                "failed to pin worker thread"
            );
        }
    }
}

/// State shared by every worker of one pool.
pub(crate) struct Registry {
    pub(crate) injector: Injector<Job>,
    pub(crate) stealers: Vec<Stealer<Job>>,
    pub(crate) stats: Vec<CachePadded<WorkerStats>>,
    pub(crate) sleep: Sleep,
    pub(crate) panic_handler: PanicHandler,
    pub(crate) steal_policy: StealPolicy,
    idle_timeout: Duration,
    shutdown: AtomicBool,
    // Jobs pushed but not yet finished, queued or running.
    pending: AtomicUsize,
}

impl Registry {
    /// Root submission path. Rejected once shutdown was signaled.
    pub(crate) fn inject(&self, job: Job) -> Result<()> {
        // Count first so a worker cannot observe "shutdown and drained"
        // between the check below and the push.
        self.job_pushed();

        if self.is_shutdown() {
            self.job_finished();
            tracing::debug!(task = %job.id, "rejected submission to shut down pool");
            return Err(Error::PoolShutdown);
        }

        self.injector.push(job);
        self.sleep.notify_one();
        Ok(())
    }

    pub(crate) fn job_pushed(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn job_finished(&self) {
        let before = self.pending.fetch_sub(1, Ordering::SeqCst);
        if before == 1 && self.is_shutdown() {
            self.sleep.notify_all();
        }
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Shutdown was signaled and every queued or running job has finished.
    pub(crate) fn is_terminating(&self) -> bool {
        self.is_shutdown() && self.pending.load(Ordering::SeqCst) == 0
    }

    pub(crate) fn has_visible_work(&self) -> bool {
        !self.injector.is_empty() || self.stealers.iter().any(|s| !s.is_empty())
    }

    pub(crate) fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Snapshot of one worker's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStatsSnapshot {
    pub id: WorkerId,
    pub jobs_executed: u64,
    pub jobs_stolen: u64,
    pub tasks_failed: u64,
}

/// Snapshot of a pool's counters, see [`ForkJoinPool::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: Vec<WorkerStatsSnapshot>,
    /// Panics caught by the pool's panic handler. Each one also counts as a
    /// failed task.
    pub tasks_panicked: u64,
}

impl PoolStats {
    /// Jobs run by pool threads, including queue entries whose task had
    /// already been claimed by a joiner.
    pub fn jobs_executed(&self) -> u64 {
        self.workers.iter().map(|w| w.jobs_executed).sum()
    }

    /// Jobs taken from another worker's deque.
    pub fn jobs_stolen(&self) -> u64 {
        self.workers.iter().map(|w| w.jobs_stolen).sum()
    }

    /// Tasks computed on pool threads that ended in `Failed`.
    pub fn tasks_failed(&self) -> u64 {
        self.workers.iter().map(|w| w.tasks_failed).sum()
    }
}

/// A fixed-size work-stealing pool for fork/join tasks.
///
/// Each worker owns a deque: tasks forked on a worker go to the head of its
/// own deque and are popped LIFO, idle workers steal the oldest entry from
/// the tail of another worker's deque. Root tasks submitted from outside the
/// pool go through a shared injector.
pub struct ForkJoinPool {
    registry: Arc<Registry>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    terminated: AtomicBool,
    config: Config,
}

impl ForkJoinPool {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let mut queues = Vec::with_capacity(num_threads);
        let mut stealers = Vec::with_capacity(num_threads);

        for _ in 0..num_threads {
            let queue = WorkerQueue::new_lifo();
            stealers.push(queue.stealer());
            queues.push(queue);
        }

        let registry = Arc::new(Registry {
            injector: Injector::new(),
            stealers,
            stats: (0..num_threads)
                .map(|_| CachePadded::new(WorkerStats::default()))
                .collect(),
            sleep: Sleep::new(),
            panic_handler: PanicHandler::new(config.panic_strategy),
            steal_policy: config.steal_policy,
            idle_timeout: config.idle_timeout,
            shutdown: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
        });

        let pool = Self {
            registry: registry.clone(),
            threads: Mutex::new(Vec::with_capacity(num_threads)),
            terminated: AtomicBool::new(false),
            config: config.clone(),
        };

        for (id, queue) in queues.into_iter().enumerate() {
            let registry = registry.clone();
            let name = format!("{}-{}", config.thread_name_prefix, id);

            let mut builder = thread::Builder::new().name(name);

            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pin_workers = config.pin_workers;
            let spawned = builder.spawn(move || {
                // Pin worker to core if requested
                #[cfg(target_os = "linux")]
                if pin_workers {
                    pin_thread_to_core(id % num_cpus::get());
                }
                #[cfg(not(target_os = "linux"))]
                let _ = pin_workers;

                Rc::new(WorkerThread::new(id, queue, registry)).start();
            });

            match spawned {
                Ok(handle) => pool.threads.lock().push(handle),
                Err(e) => {
                    // Dropping `pool` stops the workers spawned so far.
                    return Err(Error::executor(format!("spawn failed: {}", e)));
                }
            }
        }

        tracing::debug!(
            threads = num_threads,
            steal_policy = ?config.steal_policy,
            "fork/join pool started"
        );

        Ok(pool)
    }

    /// Pool with `n` workers and otherwise default settings.
    pub fn with_threads(n: usize) -> Result<Self> {
        Self::new(Config::builder().num_threads(n).build()?)
    }

    /// Schedules a closure as a root task.
    pub fn spawn<F, T>(&self, f: F) -> Result<ForkJoinTask<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = ForkJoinTask::new(f);
        task.fork_into(&self.registry)?;
        Ok(task)
    }

    /// Schedules a value-producing recursive task as a root task.
    pub fn submit<R: RecursiveTask>(&self, task: R) -> Result<ForkJoinTask<R::Output>> {
        let task = ForkJoinTask::from_task(task);
        task.fork_into(&self.registry)?;
        Ok(task)
    }

    /// Schedules a recursive action as a root task.
    pub fn submit_action<A: RecursiveAction>(&self, action: A) -> Result<ForkJoinTask<()>> {
        let task = ForkJoinTask::from_action(action);
        task.fork_into(&self.registry)?;
        Ok(task)
    }

    /// Submits `task` and blocks until its result is available.
    pub fn invoke<R: RecursiveTask>(&self, task: R) -> Result<R::Output> {
        self.submit(task)?.join()
    }

    /// Stops accepting root submissions, drains every queued and running
    /// job, then joins the worker threads.
    ///
    /// Subtasks forked while draining still run. Calling this from one of
    /// the pool's own workers only signals; the threads finish once the
    /// calling task returns.
    pub fn shutdown(&self) {
        if !self.registry.shutdown.swap(true, Ordering::SeqCst) {
            tracing::debug!(
                pending = self.registry.pending(),
                sleeping = self.registry.sleep.sleepers(),
                "fork/join pool shutting down"
            );
        }
        self.registry.sleep.notify_all();

        if let Some(worker) = WorkerThread::current() {
            if worker.belongs_to(&self.registry) {
                tracing::warn!(worker = worker.id(), "shutdown called from a pool worker, not joining");
                return;
            }
        }

        let mut threads = self.threads.lock();
        for handle in threads.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }

        if !self.terminated.swap(true, Ordering::SeqCst) {
            tracing::debug!("fork/join pool terminated");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.registry.is_shutdown()
    }

    /// True once [`shutdown`](Self::shutdown) has joined every worker.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn num_threads(&self) -> usize {
        self.registry.stealers.len()
    }

    /// Jobs queued or running right now.
    pub fn pending_jobs(&self) -> usize {
        self.registry.pending()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self
                .registry
                .stats
                .iter()
                .enumerate()
                .map(|(id, stats)| WorkerStatsSnapshot {
                    id,
                    jobs_executed: stats.jobs_executed.load(Ordering::Relaxed),
                    jobs_stolen: stats.jobs_stolen.load(Ordering::Relaxed),
                    tasks_failed: stats.tasks_failed.load(Ordering::Relaxed),
                })
                .collect(),
            tasks_panicked: self.registry.panic_handler.caught(),
        }
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl std::fmt::Debug for ForkJoinPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkJoinPool")
            .field("num_threads", &self.num_threads())
            .field("pending_jobs", &self.pending_jobs())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl Drop for ForkJoinPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
