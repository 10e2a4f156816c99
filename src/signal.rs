use crate::sync::{AtomicUsize, Condvar, Mutex};

/// Wake/sleep signalling hub shared by a manager's workers, its job
/// states, and any assisting threads.
///
/// One mutex/condvar pair covers the whole pool because wake-ups are
/// coarse: anyone completing a job may unblock any worker waiting on any
/// queue whose eligibility just changed. Waiters re-check the pop
/// predicate under this lock, and producers notify after their state
/// change is visible, so no wakeup is lost.
///
/// Lock order is always this lock first, then a per-worker queue lock.
pub(crate) struct Signal {
    pub(crate) lock: Mutex<()>,
    pub(crate) cv: Condvar,
    /// Number of workers currently inside a delegate.
    pub(crate) active_workers: AtomicUsize,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            cv: Condvar::new(),
            active_workers: AtomicUsize::new(0),
        }
    }

    /// Wakes one waiter. Briefly takes the lock first: a waiter that
    /// checked the predicate before our mutation is then guaranteed to be
    /// inside the wait, so the notify cannot fall into the gap between
    /// its check and its sleep.
    pub(crate) fn notify_one(&self) {
        drop(self.lock.lock());
        self.cv.notify_one();
    }

    /// Wakes every waiter; same lock bridge as [`Signal::notify_one`].
    pub(crate) fn notify_all(&self) {
        drop(self.lock.lock());
        self.cv.notify_all();
    }
}
