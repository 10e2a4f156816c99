use crate::{
    config::JobManagerDescriptor,
    event::{EventFanIn, JobEvent, JobSystemStats},
    queue::JobEntry,
    signal::Signal,
    sync::{sleep_us, AtomicUsize, Ordering},
    types::JobHandle,
    worker::Worker,
};
use derive_more::Debug;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Microseconds an assisting thread sleeps when no job is available.
const ASSIST_IDLE_US: u64 = 100;

/// Error returned by [`JobManager::create`] for an unusable
/// configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateError {
    /// The descriptor configured zero workers.
    #[error("job manager descriptor configures no workers")]
    NoWorkers,
}

/// Owns the worker pool and acts as the primary interface to the job
/// queues.
///
/// Key responsibilities:
/// - Spawns one worker thread per descriptor entry and wires them up for
///   work-stealing.
/// - Dispatches new jobs round-robin across the workers.
/// - Lets submitting threads assist: running queued jobs inline instead
///   of blocking idle while they wait for a target job or for the whole
///   graph to drain.
/// - Fans worker lifecycle events into counters and the optional user
///   observer.
#[must_use]
#[derive(Debug)]
pub struct JobManager {
    workers: Vec<Arc<Worker>>,
    #[debug(skip)]
    peers: Arc<[Arc<Worker>]>,
    #[debug(skip)]
    next_round_robin: AtomicUsize,
    #[debug(skip)]
    signal: Arc<Signal>,
    #[debug(skip)]
    events: Arc<EventFanIn>,
}

impl JobManager {
    /// Spawns one worker per descriptor entry.
    ///
    /// Workers are constructed first and started second, so every thread
    /// observes the complete peer array for stealing.
    ///
    /// # Errors
    /// [`CreateError::NoWorkers`] if the descriptor configures zero
    /// workers.
    pub fn create(desc: JobManagerDescriptor) -> Result<Self, CreateError> {
        if desc.workers.is_empty() {
            return Err(CreateError::NoWorkers);
        }
        let signal = Arc::new(Signal::new());
        let events = Arc::new(EventFanIn::new(desc.observer));
        let workers: Vec<Arc<Worker>> = desc
            .workers
            .into_iter()
            .enumerate()
            .map(|(index, worker_desc)| {
                Arc::new(Worker::new(
                    index,
                    worker_desc,
                    Arc::clone(&signal),
                    Arc::clone(&events),
                ))
            })
            .collect();
        let peers: Arc<[Arc<Worker>]> = workers.clone().into();
        for worker in &workers {
            Arc::clone(worker).start(Arc::clone(&peers));
        }
        debug!(workers = workers.len(), "job manager created");
        Ok(Self {
            workers,
            peers,
            next_round_robin: AtomicUsize::new(0),
            signal,
            events,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of workers currently executing a delegate.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.signal.active_workers.load(Ordering::Relaxed)
    }

    /// Submits a job in the not-ready state, dispatching round-robin
    /// across the workers.
    ///
    /// The job will not run until [`JobState::set_ready`] is called on
    /// the returned handle, typically via a chain's `go`. Dispatch is
    /// blind to load; work-stealing balances after the fact.
    ///
    /// [`JobState::set_ready`]: crate::state::JobState::set_ready
    pub fn add_job(&self, delegate: impl FnOnce() + Send + 'static, debug_tag: char) -> JobHandle {
        let index = self.next_round_robin.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[index].push_job(Box::new(delegate), debug_tag)
    }

    /// Runs queued jobs on the calling thread until `target` completes.
    ///
    /// The target must have been readied. Jobs are popped through worker
    /// 0's stealing scan, which reaches every queue; the workers stay
    /// alive for the whole call because the manager still owns them.
    pub fn assist_until_job_done(&self, target: &JobHandle) {
        debug_assert!(
            target.is_ready(),
            "JobManager::assist_until_job_done: target was never readied"
        );
        while !target.is_done() {
            let (found, _saw_waiting) = self.workers[0].pop_next_job(&self.peers, true);
            match found {
                Some(entry) => self.run_assisted(entry),
                // Nothing eligible: either the workers hold the remaining
                // jobs or this thread took the only one.
                None => sleep_us(ASSIST_IDLE_US),
            }
        }
    }

    /// Runs jobs on the calling thread until every queue is drained.
    ///
    /// Scans each worker without the stealing fallback and terminates
    /// once a full pass finds nothing eligible and nothing still waiting
    /// on dependencies.
    pub fn assist_until_done(&self) {
        let mut found_busy_worker = true;
        while found_busy_worker {
            found_busy_worker = false;
            for worker in &self.workers {
                let (found, saw_waiting) = worker.pop_next_job(&self.peers, false);
                if saw_waiting {
                    found_busy_worker = true;
                }
                if let Some(entry) = found {
                    self.run_assisted(entry);
                    found_busy_worker = true;
                    break;
                }
            }
        }
        for worker in &self.workers {
            debug_assert_eq!(
                worker.queue_len(),
                0,
                "JobManager::assist_until_done: queue not drained"
            );
        }
    }

    /// Runs one entry inline on the synthetic assist lane.
    fn run_assisted(&self, entry: JobEntry) {
        let assist_lane = self.workers.len();
        let JobEntry { delegate, state } = entry;
        self.events
            .notify(JobEvent::Start, assist_lane, Some(&state));
        delegate();
        self.events.notify(JobEvent::Done, assist_lane, Some(&state));
        state.set_done();
        self.events
            .notify(JobEvent::RunAssisted, assist_lane, Some(&state));
        self.signal.notify_one();
    }

    /// Snapshot of the event counters.
    pub fn stats(&self) -> JobSystemStats {
        self.events.stats()
    }

    /// Stops and joins every worker, optionally draining all queues
    /// first.
    ///
    /// With `finish_jobs == false`, un-popped entries are dropped: their
    /// dependants are never released, and any thread blocked in
    /// [`JobState::wait`] on such a job will never return.
    ///
    /// [`JobState::wait`]: crate::state::JobState::wait
    pub fn shutdown(&mut self, finish_jobs: bool) {
        if self.workers.is_empty() {
            return;
        }
        if finish_jobs {
            self.assist_until_done();
        }
        debug!(jobs_run = self.stats().jobs_run, "job manager shutting down");
        for worker in &self.workers {
            worker.shutdown(true);
        }
        self.workers.clear();
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.shutdown(false);
    }
}
