use crate::{
    signal::Signal,
    sync::{sleep_us, AtomicBool, AtomicI32, Mutex, Ordering},
    types::{JobHandle, JobId},
};
use derive_more::Debug;
use std::sync::Arc;

/// Process-wide id assignment. Diagnostic only, so a plain std atomic even
/// under loom.
static NEXT_JOB_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Poll granularity of [`JobState::wait`].
const WAIT_TICK_US: u64 = 10;

/// Shared record tracking readiness, completion, cancellation, and
/// dependants for one job.
///
/// Callers can [`wait`](JobState::wait) on a handle to ensure a given job
/// is complete, or [`cancel`](JobState::cancel) it. Blocking in `wait` is
/// not good practice with a job system, however: if no hardware threads
/// are available to process the job, the caller can stall for significant
/// time. Prefer the manager's assist loops, which run work instead of
/// sleeping.
#[must_use]
#[derive(Debug)]
pub struct JobState {
    id: JobId,
    debug_tag: char,
    ready: AtomicBool,
    done: AtomicBool,
    cancel: AtomicBool,
    /// Successors that must not start until this job completes. Written
    /// only while the graph is being built; read-only once readied.
    #[debug(skip)]
    dependants: Mutex<Vec<JobHandle>>,
    /// Number of predecessors that have not completed yet.
    outstanding: AtomicI32,
    #[debug(skip)]
    signal: Arc<Signal>,
}

impl JobState {
    pub(crate) fn new(debug_tag: char, signal: Arc<Signal>) -> Self {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            debug_tag,
            ready: AtomicBool::new(false),
            done: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            dependants: Mutex::new(Vec::new()),
            outstanding: AtomicI32::new(0),
            signal,
        }
    }

    /// Diagnostic id, unique within this process run.
    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Single-character diagnostic tag, `'\0'` when untagged.
    #[must_use]
    pub fn debug_tag(&self) -> char {
        self.debug_tag
    }

    /// Marks the job ready for processing and broadcasts the wake signal.
    ///
    /// Chains call this for every job from `go`; call it exactly once per
    /// job when wiring graphs by hand.
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
        self.signal.notify_all();
    }

    /// Whether the job has been marked ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Requests cancellation.
    ///
    /// Cooperative: a still-queued job is discarded (and marked done) on
    /// the next queue scan; a job already running completes normally.
    /// Either way its dependants are still released.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub(crate) fn awaiting_cancellation(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Whether the job has run to completion or been discarded as
    /// cancelled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Polls [`is_done`](JobState::is_done) in 10 µs ticks, returning once
    /// done or after at least `max_us` microseconds have elapsed; `0`
    /// waits indefinitely.
    pub fn wait(&self, max_us: u64) {
        let mut waited_us = 0;
        while !self.is_done() {
            sleep_us(WAIT_TICK_US);
            if max_us != 0 {
                waited_us += WAIT_TICK_US;
                if waited_us > max_us {
                    break;
                }
            }
        }
    }

    /// Registers `dependant` to start only after this job completes.
    ///
    /// Must be called strictly before either job is readied; the chain
    /// builder enforces this by construction.
    pub fn add_dependant(&self, dependant: &JobHandle) {
        debug_assert!(
            !self.is_ready() && !dependant.is_ready(),
            "JobState::add_dependant: edge added after a job was readied"
        );
        self.dependants.lock().push(Arc::clone(dependant));
        dependant.outstanding.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether the job is eligible to start: readied, with every
    /// predecessor complete.
    #[must_use]
    pub fn dependencies_met(&self) -> bool {
        // The Acquire pairs with the Release decrement in `set_done`, so
        // the thread that runs this job observes its predecessors' writes.
        self.ready.load(Ordering::Acquire) && self.outstanding.load(Ordering::Acquire) <= 0
    }

    /// Releases dependants, then publishes completion.
    pub(crate) fn set_done(&self) {
        for dependant in self.dependants.lock().iter() {
            dependant.outstanding.fetch_sub(1, Ordering::Release);
        }
        self.done.store(true, Ordering::Release);
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    fn handle(signal: &Arc<Signal>) -> JobHandle {
        Arc::new(JobState::new('\0', Arc::clone(signal)))
    }

    #[test]
    fn unreadied_job_is_never_eligible() {
        let signal = Arc::new(Signal::new());
        let job = handle(&signal);
        assert!(!job.dependencies_met());
        job.set_ready();
        assert!(job.dependencies_met());
    }

    #[test]
    fn completion_releases_each_dependant_once() {
        let signal = Arc::new(Signal::new());
        let first = handle(&signal);
        let second = handle(&signal);
        let join = handle(&signal);
        first.add_dependant(&join);
        second.add_dependant(&join);
        join.set_ready();

        assert!(!join.dependencies_met());
        first.set_done();
        assert!(!join.dependencies_met());
        second.set_done();
        assert!(join.dependencies_met());
    }

    #[test]
    fn bounded_wait_returns_without_completion() {
        let signal = Arc::new(Signal::new());
        let job = handle(&signal);
        job.wait(100);
        assert!(!job.is_done());
    }

    #[test]
    fn ids_are_distinct() {
        let signal = Arc::new(Signal::new());
        assert_ne!(handle(&signal).id(), handle(&signal).id());
    }
}
