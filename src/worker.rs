use crate::{
    config::WorkerDescriptor,
    event::{EventFanIn, JobEvent},
    queue::{JobEntry, JobQueue},
    signal::Signal,
    state::JobState,
    sync::{sleep_us, AtomicBool, Mutex, Ordering},
    types::{JobDelegate, JobHandle},
};
use derive_more::Debug;
use std::sync::Arc;
use tracing::trace;

/// Microseconds between wake broadcasts while waiting for a worker to
/// acknowledge its stop flag.
const SHUTDOWN_POLL_US: u64 = 100;

#[cfg(not(feature = "loom"))]
type WorkerJoinHandle = std::thread::JoinHandle<()>;
#[cfg(feature = "loom")]
type WorkerJoinHandle = loom::thread::JoinHandle<()>;

/// A worker thread and the queue it owns.
///
/// Any thread may push to or pop-scan the queue under its lock: the
/// owning worker, a stealing peer, or an assisting caller.
#[derive(Debug)]
pub(crate) struct Worker {
    index: usize,
    desc: WorkerDescriptor,
    #[debug(skip)]
    queue: Mutex<JobQueue>,
    #[debug(skip)]
    stop: AtomicBool,
    #[debug(skip)]
    has_shut_down: AtomicBool,
    #[debug(skip)]
    thread: Mutex<Option<WorkerJoinHandle>>,
    #[debug(skip)]
    signal: Arc<Signal>,
    #[debug(skip)]
    events: Arc<EventFanIn>,
}

impl Worker {
    pub(crate) fn new(
        index: usize,
        desc: WorkerDescriptor,
        signal: Arc<Signal>,
        events: Arc<EventFanIn>,
    ) -> Self {
        Self {
            index,
            desc,
            queue: Mutex::new(JobQueue::default()),
            stop: AtomicBool::new(false),
            has_shut_down: AtomicBool::new(false),
            thread: Mutex::new(None),
            signal,
            events,
        }
    }

    /// Spawns the worker thread. `peers` must contain every worker of the
    /// manager, self included, in index order.
    pub(crate) fn start(self: Arc<Self>, peers: Arc<[Arc<Worker>]>) {
        let worker = Arc::clone(&self);
        let handle = spawn_worker_thread(&self.desc, move || worker.run(&peers));
        *self.thread.lock() = Some(handle);
    }

    /// Creates a job in the not-ready state and queues it at the front.
    pub(crate) fn push_job(&self, delegate: JobDelegate, debug_tag: char) -> JobHandle {
        let state: JobHandle = Arc::new(JobState::new(debug_tag, Arc::clone(&self.signal)));
        self.queue.lock().push(JobEntry {
            delegate,
            state: Arc::clone(&state),
        });
        state
    }

    /// Requests the thread to stop, waking it until it acknowledges, then
    /// joins it when `wait` is set.
    pub(crate) fn shutdown(&self, wait: bool) {
        self.stop.store(true, Ordering::Relaxed);
        while !self.has_shut_down.load(Ordering::Acquire) {
            self.signal.notify_all();
            sleep_us(SHUTDOWN_POLL_US);
        }
        if wait {
            if let Some(handle) = self.thread.lock().take() {
                let _ = handle.join();
            }
        }
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Pops from the own queue, falling back to scanning peers in index
    /// order when `use_stealing` is set. Returns the job, if any, and
    /// whether some scanned queue held an entry that was merely not ready
    /// yet.
    pub(crate) fn pop_next_job(
        &self,
        peers: &[Arc<Worker>],
        use_stealing: bool,
    ) -> (Option<JobEntry>, bool) {
        let mut saw_waiting = false;
        let mut found = self.queue.lock().pop_eligible(&mut saw_waiting);
        let mut stolen = false;

        if found.is_none() && use_stealing {
            for peer in peers {
                found = peer.queue.lock().pop_eligible(&mut saw_waiting);
                if found.is_some() {
                    stolen = true;
                    break;
                }
            }
        }

        if let Some(entry) = &found {
            self.events
                .notify(JobEvent::Popped, self.index, Some(&entry.state));
            if stolen {
                trace!(
                    worker = self.index,
                    job = entry.state.id(),
                    "stole job from a peer queue"
                );
                self.events
                    .notify(JobEvent::Stolen, self.index, Some(&entry.state));
            }
        }
        (found, saw_waiting)
    }

    fn run(&self, peers: &[Arc<Worker>]) {
        trace!(worker = self.index, name = %self.desc.name, "worker thread started");
        loop {
            let mut popped = None;
            {
                // The pop predicate is re-checked under the signal lock,
                // and producers notify only after their queue or state
                // mutation is visible, so no wakeup is lost. Queue locks
                // nest inside the signal lock, never the reverse.
                let mut signal_guard = self.signal.lock.lock();
                loop {
                    if self.stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let (found, _saw_waiting) =
                        self.pop_next_job(peers, self.desc.enable_work_stealing);
                    if let Some(entry) = found {
                        popped = Some(entry);
                        break;
                    }
                    self.signal.cv.wait(&mut signal_guard);
                    self.events.notify(JobEvent::WorkerAwoken, self.index, None);
                }
            }

            let Some(entry) = popped else {
                self.has_shut_down.store(true, Ordering::Release);
                break;
            };

            self.signal.active_workers.fetch_add(1, Ordering::AcqRel);
            self.events
                .notify(JobEvent::WorkerUsed, self.index, Some(&entry.state));
            self.execute(entry);
            self.signal.active_workers.fetch_sub(1, Ordering::AcqRel);
        }
        trace!(worker = self.index, "worker thread stopped");
    }

    /// Runs one entry to completion, releases its dependants, and wakes a
    /// peer whose eligibility may have changed.
    fn execute(&self, entry: JobEntry) {
        let JobEntry { delegate, state } = entry;
        self.events.notify(JobEvent::Start, self.index, Some(&state));
        delegate();
        self.events.notify(JobEvent::Done, self.index, Some(&state));
        state.set_done();
        self.events.notify(JobEvent::Run, self.index, Some(&state));
        self.signal.notify_one();
    }
}

#[cfg(not(feature = "loom"))]
fn spawn_worker_thread(
    desc: &WorkerDescriptor,
    body: impl FnOnce() + Send + 'static,
) -> WorkerJoinHandle {
    let affinity = desc.affinity;
    std::thread::Builder::new()
        .name(desc.name.clone())
        .spawn(move || {
            crate::platform::bind_current_thread(affinity);
            body();
        })
        .expect("Worker::start: failed to spawn worker thread")
}

#[cfg(feature = "loom")]
fn spawn_worker_thread(
    _desc: &WorkerDescriptor,
    body: impl FnOnce() + Send + 'static,
) -> WorkerJoinHandle {
    loom::thread::spawn(body)
}
