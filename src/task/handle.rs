use super::state::TaskState;
use super::{RecursiveAction, RecursiveTask};
use crate::error::{Error, Result};
use crate::executor::job::{Job, TaskId};
use crate::executor::latch::Latch;
use crate::executor::pool::Registry;
use crate::executor::worker::WorkerThread;
use crate::executor::PanicHandler;
use crate::executor::PanicStrategy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

type Body<T> = Box<dyn FnOnce() -> Result<T> + Send + 'static>;

// Used for bodies computed inline on threads that do not belong to a pool.
static DETACHED_PANIC_HANDLER: PanicHandler = PanicHandler::new(PanicStrategy::LogAndContinue);

struct TaskCell<T> {
    id: TaskId,
    state: AtomicU8,
    forked: AtomicBool,
    // Pool the task was forked into; only its workers compute it.
    owner: Mutex<Option<Arc<Registry>>>,
    body: Mutex<Option<Body<T>>>,
    outcome: Mutex<Option<Result<T>>>,
    latch: Latch,
}

impl<T: Send + 'static> TaskCell<T> {
    fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claims the task for the calling thread. Only one caller ever wins.
    fn claim(&self) -> bool {
        self.state
            .compare_exchange(
                TaskState::Pending as u8,
                TaskState::Computing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Computes the task if it is still pending. Returns whether this call
    /// did the work.
    fn run(&self) -> bool {
        if !self.claim() {
            return false;
        }

        let body = self.body.lock().take();
        let outcome = match body {
            Some(body) => match WorkerThread::current() {
                Some(worker) => worker.run_task_body(body),
                None => DETACHED_PANIC_HANDLER
                    .execute(body)
                    .unwrap_or_else(|panic| Err(panic.into())),
            },
            None => Err(Error::executor("task body already taken")),
        };

        self.complete(outcome);
        true
    }

    /// Fails a task that was never started, e.g. after a rejected fork.
    fn abandon(&self, err: Error) {
        if self.claim() {
            self.body.lock().take();
            self.complete(Err(err));
        }
    }

    fn complete(&self, outcome: Result<T>) {
        let state = if outcome.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };

        if let Err(err) = &outcome {
            tracing::debug!(task = %self.id, error = %err, "task failed");
        }

        *self.outcome.lock() = Some(outcome);
        self.state.store(state as u8, Ordering::Release);
        self.latch.set();
    }
}

/// Handle to a unit of fork/join work.
///
/// Handles are cheap to clone; every clone refers to the same task, so any
/// number of threads may `join` it and all of them observe the same result
/// or the same error. The task's body runs at most once.
pub struct ForkJoinTask<T> {
    cell: Arc<TaskCell<T>>,
}

impl<T> Clone for ForkJoinTask<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Send + 'static> ForkJoinTask<T> {
    /// A pending task that will run `f` when forked, joined or invoked.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self {
            cell: Arc::new(TaskCell {
                id: TaskId::next(),
                state: AtomicU8::new(TaskState::Pending as u8),
                forked: AtomicBool::new(false),
                owner: Mutex::new(None),
                body: Mutex::new(Some(Box::new(f))),
                outcome: Mutex::new(None),
                latch: Latch::new(),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.cell.id
    }

    pub fn state(&self) -> TaskState {
        self.cell.state()
    }

    pub fn is_done(&self) -> bool {
        self.cell.latch.probe()
    }

    pub fn is_forked(&self) -> bool {
        self.cell.forked.load(Ordering::Acquire)
    }

    /// Schedules the task for asynchronous execution and returns at once.
    ///
    /// On a pool thread the task goes to the head of that worker's own
    /// deque; anywhere else it is submitted to the global pool. Forking a
    /// task twice, or forking one that already started, does nothing. If the
    /// global pool rejects the task it fails with that error.
    pub fn fork(&self) -> &Self {
        match WorkerThread::current() {
            Some(worker) => {
                if self.mark_forked(worker.registry()) {
                    worker.push(self.to_job());
                }
            }
            None => {
                let submitted = crate::runtime::global_pool().and_then(|pool| {
                    if self.mark_forked(pool.registry()) {
                        pool.registry().inject(self.to_job())
                    } else {
                        Ok(())
                    }
                });
                if let Err(err) = submitted {
                    self.cell.abandon(err);
                }
            }
        }
        self
    }

    /// Records `registry` as the owning pool. Returns false if the task was
    /// already forked or already started.
    fn mark_forked(&self, registry: &Arc<Registry>) -> bool {
        let mut owner = self.cell.owner.lock();
        if self.cell.forked.swap(true, Ordering::AcqRel) {
            tracing::trace!(task = %self.cell.id, "task already forked");
            return false;
        }
        if self.state() != TaskState::Pending {
            return false;
        }
        *owner = Some(registry.clone());
        true
    }

    /// Whether `worker` may compute this task or help while it runs.
    /// Tasks owned by another pool are left to that pool's workers.
    fn runs_on(&self, worker: &WorkerThread) -> bool {
        match self.cell.owner.lock().as_ref() {
            Some(owner) => worker.belongs_to(owner),
            None => true,
        }
    }

    /// Submits to a specific pool. Root submissions after shutdown are
    /// rejected and leave the task untouched.
    pub(crate) fn fork_into(&self, registry: &Arc<Registry>) -> Result<()> {
        if registry.is_shutdown() {
            return Err(Error::PoolShutdown);
        }
        if !self.mark_forked(registry) {
            return Ok(());
        }

        let job = self.to_job();
        match WorkerThread::current() {
            Some(worker) if worker.belongs_to(registry) => {
                worker.push(job);
                Ok(())
            }
            _ => registry.inject(job).map_err(|err| {
                let mut owner = self.cell.owner.lock();
                *owner = None;
                self.cell.forked.store(false, Ordering::Release);
                err
            }),
        }
    }

    fn to_job(&self) -> Job {
        let cell = self.cell.clone();
        Job::new(self.cell.id, move || {
            cell.run();
        })
    }

    /// Blocks until the task is terminal without retrieving the result.
    ///
    /// An unforked task is computed inline. On a worker of the owning pool
    /// a pending task is claimed and computed inline too, and while another
    /// thread computes it the worker runs other queued or stealable jobs.
    /// Anywhere else, including workers of other pools, this is a plain
    /// condition-variable wait.
    pub fn wait(&self) {
        if self.cell.latch.probe() {
            return;
        }

        match WorkerThread::current() {
            Some(worker) if self.runs_on(&worker) => {
                if !self.cell.run() {
                    worker.wait_until(&self.cell.latch);
                }
            }
            _ => {
                if self.is_forked() || !self.cell.run() {
                    self.cell.latch.wait();
                }
            }
        }
    }
}

impl<T: Clone + Send + 'static> ForkJoinTask<T> {
    /// Waits for the task and returns its result or its captured error.
    ///
    /// Joining a terminal task again returns the same outcome without
    /// recomputing.
    pub fn join(&self) -> Result<T> {
        self.wait();
        self.outcome()
    }

    /// Computes the task on the calling thread, or joins it if some other
    /// thread already started it.
    pub fn invoke(&self) -> Result<T> {
        self.cell.forked.store(true, Ordering::Release);
        if !self.cell.run() {
            return self.join();
        }
        self.outcome()
    }

    /// The outcome if the task is terminal, without blocking.
    pub fn try_get(&self) -> Option<Result<T>> {
        if self.is_done() {
            Some(self.outcome())
        } else {
            None
        }
    }

    fn outcome(&self) -> Result<T> {
        self.cell
            .outcome
            .lock()
            .clone()
            .unwrap_or_else(|| Err(Error::executor("task finished without an outcome")))
    }
}

impl<T: Clone + Send + 'static> ForkJoinTask<T> {
    /// Wraps a value-producing recursive task.
    pub fn from_task<R>(task: R) -> Self
    where
        R: RecursiveTask<Output = T>,
    {
        Self::new(move || task.compute())
    }
}

impl ForkJoinTask<()> {
    /// Wraps a recursive action.
    pub fn from_action<A: RecursiveAction>(action: A) -> Self {
        Self::new(move || action.compute())
    }
}

impl<T> std::fmt::Debug for ForkJoinTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkJoinTask")
            .field("id", &self.cell.id)
            .field(
                "state",
                &TaskState::from_u8(self.cell.state.load(Ordering::Acquire)),
            )
            .finish()
    }
}

/// Forks every task but the last, computes the last one on the calling
/// thread, then joins the forked ones.
///
/// Returns the results in task order, or the error of the first failed task
/// in task order. Every task is terminal when this returns, including on
/// error.
pub fn invoke_all<T>(tasks: &[ForkJoinTask<T>]) -> Result<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let Some((last, rest)) = tasks.split_last() else {
        return Ok(Vec::new());
    };

    for task in rest {
        task.fork();
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    outcomes.push(last.invoke());

    // Most recently forked first: it is the one on top of our own deque.
    for task in rest.iter().rev() {
        outcomes.push(task.join());
    }

    outcomes.reverse();
    outcomes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ForkJoinPool;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn counting_task(counter: &Arc<AtomicUsize>, value: u64) -> ForkJoinTask<u64> {
        let counter = counter.clone();
        ForkJoinTask::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        })
    }

    #[test]
    fn test_unforked_join_runs_inline() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(&counter, 5);

        assert_eq!(task.state(), TaskState::Pending);
        assert_eq!(task.join(), Ok(5));
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_join_does_not_recompute() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(&counter, 9);

        for _ in 0..5 {
            assert_eq!(task.join(), Ok(9));
        }
        assert_eq!(task.invoke(), Ok(9));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_get() {
        let task = ForkJoinTask::new(|| Ok("done"));
        assert!(task.try_get().is_none());
        task.invoke().unwrap();
        assert_eq!(task.try_get(), Some(Ok("done")));
    }

    #[test]
    fn test_failure_is_captured() {
        let task: ForkJoinTask<u32> = ForkJoinTask::new(|| Err(Error::task_failed("bad")));

        assert_eq!(task.join(), Err(Error::task_failed("bad")));
        assert_eq!(task.state(), TaskState::Failed);
        assert_eq!(task.join(), Err(Error::task_failed("bad")));
    }

    #[test]
    fn test_panic_is_captured() {
        let task = ForkJoinTask::new(|| -> Result<u32> { panic!("kaboom") });

        assert_eq!(task.join(), Err(Error::TaskPanicked("kaboom".to_string())));
        assert_eq!(task.state(), TaskState::Failed);
    }

    #[test]
    fn test_joins_from_many_threads_see_same_error() {
        let pool = ForkJoinPool::with_threads(2).unwrap();
        let task: ForkJoinTask<u32> = pool
            .spawn(|| {
                thread::sleep(std::time::Duration::from_millis(10));
                Err(Error::task_failed("shared"))
            })
            .unwrap();

        let joiners: Vec<_> = (0..8)
            .map(|_| {
                let task = task.clone();
                thread::spawn(move || task.join())
            })
            .collect();

        for joiner in joiners {
            assert_eq!(joiner.join().unwrap(), Err(Error::task_failed("shared")));
        }
    }

    #[test]
    fn test_invoke_all_orders_results() {
        let pool = ForkJoinPool::with_threads(4).unwrap();
        let results = pool
            .spawn(|| {
                let tasks: Vec<ForkJoinTask<usize>> =
                    (0..16).map(|i| ForkJoinTask::new(move || Ok(i * i))).collect();
                invoke_all(&tasks)
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(results, (0..16).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn test_invoke_all_reports_first_error_after_all_finish() {
        let pool = ForkJoinPool::with_threads(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<ForkJoinTask<u64>> = (0..8)
            .map(|i| {
                let counter = counter.clone();
                ForkJoinTask::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if i == 2 || i == 5 {
                        Err(Error::task_failed(format!("child {}", i)))
                    } else {
                        Ok(i)
                    }
                })
            })
            .collect();

        let handles = tasks.clone();
        let outcome = pool
            .spawn(move || invoke_all(&handles))
            .unwrap()
            .join();

        assert_eq!(outcome, Err(Error::task_failed("child 2")));
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert!(tasks.iter().all(|t| t.is_done()));
        assert_eq!(tasks[3].join(), Ok(3));
    }

    #[test]
    fn test_invoke_all_empty() {
        let tasks: Vec<ForkJoinTask<u8>> = Vec::new();
        assert_eq!(invoke_all(&tasks), Ok(Vec::new()));
    }

    #[test]
    fn test_fork_twice_runs_once() {
        let pool = ForkJoinPool::with_threads(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(&counter, 1);

        let inner = task.clone();
        pool.spawn(move || {
            inner.fork();
            inner.fork();
            inner.join()
        })
        .unwrap()
        .join()
        .unwrap();

        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
