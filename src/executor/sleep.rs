//! Parking for idle workers.
//!
//! Workers that find nothing to run after backing off park here until a
//! push wakes them or the idle timeout elapses. The timeout bounds the cost
//! of any wakeup that races with a worker going to sleep.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct Sleep {
    lock: Mutex<()>,
    condvar: Condvar,
    sleepers: AtomicUsize,
}

impl Sleep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the calling thread for at most `timeout`.
    ///
    /// `has_work` is evaluated after the thread registered itself as a
    /// sleeper; if it reports work the thread returns immediately.
    pub fn sleep<F>(&self, timeout: Duration, has_work: F)
    where
        F: FnOnce() -> bool,
    {
        let mut guard = self.lock.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);

        if !has_work() {
            let _ = self.condvar.wait_for(&mut guard, timeout);
        }

        self.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    /// Wakes one parked worker, if any.
    pub fn notify_one(&self) {
        if self.sleepers.load(Ordering::SeqCst) > 0 {
            let _guard = self.lock.lock();
            self.condvar.notify_one();
        }
    }

    pub fn notify_all(&self) {
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }

    pub fn sleepers(&self) -> usize {
        self.sleepers.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_sleep_returns_immediately_with_work() {
        let sleep = Sleep::new();
        let start = Instant::now();
        sleep.sleep(Duration::from_secs(5), || true);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(sleep.sleepers(), 0);
    }

    #[test]
    fn test_sleep_times_out() {
        let sleep = Sleep::new();
        let start = Instant::now();
        sleep.sleep(Duration::from_millis(5), || false);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_notify_wakes_sleeper() {
        let sleep = Arc::new(Sleep::new());
        let woke = Arc::new(AtomicBool::new(false));

        let handle = {
            let sleep = sleep.clone();
            let woke = woke.clone();
            thread::spawn(move || {
                sleep.sleep(Duration::from_secs(10), || false);
                woke.store(true, Ordering::SeqCst);
            })
        };

        let start = Instant::now();
        while sleep.sleepers() == 0 {
            thread::yield_now();
        }
        sleep.notify_one();
        handle.join().unwrap();

        assert!(woke.load(Ordering::SeqCst));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
