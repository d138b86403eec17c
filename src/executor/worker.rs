// worker thread stuff
use super::job::Job;
use super::latch::Latch;
use super::pool::Registry;
use crate::config::StealPolicy;
use crate::error::Result;
use crate::util::Backoff;
use crossbeam_deque::{Steal, Worker as WorkerQueue};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub type WorkerId = usize;

// Pushes do not wake joiners, so a joiner with nothing to help with
// re-checks the queues at least this often.
const MAX_HELP_WAIT: Duration = Duration::from_millis(1);

thread_local! {
    static CURRENT: RefCell<Option<Rc<WorkerThread>>> = const { RefCell::new(None) };
}

// counters for each worker
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    pub jobs_executed: AtomicU64,
    pub jobs_stolen: AtomicU64,
    pub tasks_failed: AtomicU64,
}

/// Per-thread worker state. Lives in a thread-local for the lifetime of the
/// worker thread so that `fork` and `join` can find the calling worker.
pub(crate) struct WorkerThread {
    id: WorkerId,
    // LIFO: the owner pushes and pops at the same end, thieves take the
    // other (oldest) end.
    local: WorkerQueue<Job>,
    registry: Arc<Registry>,
    next_victim: Cell<usize>,
}

impl WorkerThread {
    pub fn new(id: WorkerId, local: WorkerQueue<Job>, registry: Arc<Registry>) -> Self {
        Self {
            id,
            local,
            registry,
            next_victim: Cell::new(id + 1),
        }
    }

    /// The worker running on this thread, if this is a pool thread.
    pub fn current() -> Option<Rc<WorkerThread>> {
        CURRENT.with(|current| current.borrow().clone())
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn belongs_to(&self, registry: &Arc<Registry>) -> bool {
        Arc::ptr_eq(&self.registry, registry)
    }

    /// Installs `self` as this thread's worker and runs the main loop.
    pub fn start(self: Rc<Self>) {
        CURRENT.with(|current| *current.borrow_mut() = Some(self.clone()));
        tracing::trace!(worker = self.id, "worker started");

        self.run();

        tracing::trace!(worker = self.id, "worker exiting");
        CURRENT.with(|current| *current.borrow_mut() = None);
    }

    /// Pushes a locally forked job onto the head of this worker's deque.
    pub fn push(&self, job: Job) {
        self.registry.job_pushed();
        self.local.push(job);
        self.registry.sleep.notify_one();
    }

    // main loop
    fn run(&self) {
        let mut backoff = Backoff::new();

        loop {
            // local -> global -> steal
            if let Some(job) = self.find_job() {
                backoff.reset();
                self.execute(job);
                continue;
            }

            if self.registry.is_terminating() {
                break;
            }

            if backoff.is_completed() {
                let registry = &self.registry;
                registry.sleep.sleep(registry.idle_timeout(), || {
                    registry.has_visible_work() || registry.is_terminating()
                });
            } else {
                backoff.snooze();
            }
        }
    }

    /// Keeps this worker busy until `latch` is set.
    ///
    /// Runs local, injected or stolen jobs while the awaited task is being
    /// computed elsewhere. When no job exists anywhere it waits briefly on
    /// the latch and then looks again.
    pub fn wait_until(&self, latch: &Latch) {
        let mut backoff = Backoff::new();

        while !latch.probe() {
            if let Some(job) = self.find_job() {
                backoff.reset();
                self.execute(job);
                continue;
            }

            if backoff.is_completed() {
                latch.wait_timeout(self.registry.idle_timeout().min(MAX_HELP_WAIT));
            } else {
                backoff.snooze();
            }
        }
    }

    /// Runs a task body under the pool's panic handler.
    pub fn run_task_body<T>(&self, body: impl FnOnce() -> Result<T>) -> Result<T> {
        let outcome = self
            .registry
            .panic_handler
            .execute(body)
            .unwrap_or_else(|panic| Err(panic.into()));

        if outcome.is_err() {
            self.stats().tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    fn find_job(&self) -> Option<Job> {
        // 1. Own deque, most recently forked first
        if let Some(job) = self.local.pop() {
            return Some(job);
        }

        // 2. Root submissions
        loop {
            match self.registry.injector.steal_batch_and_pop(&self.local) {
                Steal::Success(job) => return Some(job),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        // 3. Oldest job of some other worker
        self.try_steal_from_workers()
    }

    fn try_steal_from_workers(&self) -> Option<Job> {
        let stealers = &self.registry.stealers;
        let len = stealers.len();

        if len <= 1 {
            return None;
        }

        let victims: Vec<usize> = match self.registry.steal_policy {
            StealPolicy::Random => {
                use rand::seq::SliceRandom;

                let mut indices: Vec<usize> = (0..len).filter(|&idx| idx != self.id).collect();
                indices.shuffle(&mut rand::thread_rng());
                indices
            }
            StealPolicy::RoundRobin => {
                let start = self.next_victim.get();
                (0..len)
                    .map(|offset| (start + offset) % len)
                    .filter(|&idx| idx != self.id)
                    .collect()
            }
        };

        for victim in victims {
            loop {
                match stealers[victim].steal() {
                    Steal::Success(job) => {
                        self.next_victim.set(victim + 1);
                        self.stats().jobs_stolen.fetch_add(1, Ordering::Relaxed);
                        return Some(job);
                    }
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }

    fn execute(&self, job: Job) {
        let id = job.id;

        // Task bodies catch their own panics; this guards the queue
        // bookkeeping against a panicking job closure.
        if let Err(panic) = self.registry.panic_handler.execute(|| job.execute()) {
            tracing::error!(worker = self.id, task = %id, message = %panic.message, "job panicked outside its task");
        }

        self.stats().jobs_executed.fetch_add(1, Ordering::Relaxed);
        self.registry.job_finished();
    }

    fn stats(&self) -> &WorkerStats {
        &self.registry.stats[self.id]
    }
}
