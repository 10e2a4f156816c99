use crate::{
    sync::{AtomicUsize, Ordering},
    types::JobHandle,
    utils::bit,
};
use core::fmt;
use std::sync::Arc;

/// Lifecycle events emitted by workers and by the manager's assist path.
///
/// The eight kinds and their payloads are a stable contract for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEvent {
    /// A job was popped from a queue.
    Popped,
    /// A job is about to start.
    Start,
    /// A job's delegate just returned.
    Done,
    /// A job has been run to completion by a worker.
    Run,
    /// A job has been run to completion by an assisting thread.
    RunAssisted,
    /// A worker took the job from a peer's queue.
    Stolen,
    /// A worker woke from the shared signal.
    WorkerAwoken,
    /// A worker picked up work.
    WorkerUsed,
}

/// Sink for job lifecycle events.
///
/// Called outside per-worker queue locks, but possibly while the shared
/// signal lock is held; implementations must be non-blocking and
/// allocation-light. `worker` is the emitting worker's index, or the
/// manager's worker count for the synthetic assist lane. `WorkerAwoken`
/// carries no job.
pub trait JobEventObserver: Send + Sync {
    /// Record one event.
    fn observe(&self, event: JobEvent, worker: usize, job: Option<&JobHandle>);
}

/// Aggregates event counters and forwards each event to the optional user
/// sink.
pub(crate) struct EventFanIn {
    jobs_run: AtomicUsize,
    jobs_stolen: AtomicUsize,
    jobs_assisted: AtomicUsize,
    used_mask: AtomicUsize,
    awoken_mask: AtomicUsize,
    sink: Option<Arc<dyn JobEventObserver>>,
}

impl EventFanIn {
    pub(crate) fn new(sink: Option<Arc<dyn JobEventObserver>>) -> Self {
        Self {
            jobs_run: AtomicUsize::new(0),
            jobs_stolen: AtomicUsize::new(0),
            jobs_assisted: AtomicUsize::new(0),
            used_mask: AtomicUsize::new(0),
            awoken_mask: AtomicUsize::new(0),
            sink,
        }
    }

    pub(crate) fn notify(&self, event: JobEvent, worker: usize, job: Option<&JobHandle>) {
        match event {
            JobEvent::Run => {
                self.jobs_run.fetch_add(1, Ordering::Relaxed);
            }
            JobEvent::Stolen => {
                self.jobs_stolen.fetch_add(1, Ordering::Relaxed);
            }
            JobEvent::RunAssisted => {
                self.jobs_assisted.fetch_add(1, Ordering::Relaxed);
                self.jobs_run.fetch_add(1, Ordering::Relaxed);
            }
            // The masks only track the first `usize::BITS` workers.
            JobEvent::WorkerAwoken if worker < usize::BITS as usize => {
                self.awoken_mask.fetch_or(bit(worker), Ordering::Relaxed);
            }
            JobEvent::WorkerUsed if worker < usize::BITS as usize => {
                self.used_mask.fetch_or(bit(worker), Ordering::Relaxed);
            }
            _ => {}
        }
        if let Some(sink) = &self.sink {
            sink.observe(event, worker, job);
        }
    }

    pub(crate) fn stats(&self) -> JobSystemStats {
        JobSystemStats {
            jobs_run: self.jobs_run.load(Ordering::Relaxed),
            jobs_stolen: self.jobs_stolen.load(Ordering::Relaxed),
            jobs_assisted: self.jobs_assisted.load(Ordering::Relaxed),
            used_mask: self.used_mask.load(Ordering::Relaxed),
            awoken_mask: self.awoken_mask.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the manager's event counters.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSystemStats {
    /// Jobs run to completion, assisted runs included. May be less than
    /// the number submitted if jobs were cancelled or abandoned at
    /// shutdown.
    pub jobs_run: usize,
    /// Jobs taken from a peer worker's queue.
    pub jobs_stolen: usize,
    /// Jobs run by assisting threads rather than workers.
    pub jobs_assisted: usize,
    /// Bitmask of workers that have executed at least one job.
    pub used_mask: usize,
    /// Bitmask of workers that have been woken at least once.
    pub awoken_mask: usize,
}

impl fmt::Display for JobSystemStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Job System Statistics]")?;
        writeln!(f, "Jobs Run:       {:8}", self.jobs_run)?;
        writeln!(f, "Jobs Stolen:    {:8}", self.jobs_stolen)?;
        writeln!(f, "Jobs Assisted:  {:8}", self.jobs_assisted)?;
        writeln!(f, "Workers Used:   {:#010x}", self.used_mask)?;
        write!(f, "Workers Awoken: {:#010x}", self.awoken_mask)
    }
}
