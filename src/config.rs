use crate::event::JobEventObserver;
use derive_more::Debug;
use std::sync::Arc;

/// Configuration for a single worker thread.
#[derive(Debug, Clone)]
pub struct WorkerDescriptor {
    /// Thread name, for debug and profiling displays.
    pub name: String,
    /// CPU affinity bitmask. An all-ones mask leaves the thread unpinned.
    pub affinity: usize,
    /// Whether this worker may take jobs from peer queues when its own
    /// runs dry.
    pub enable_work_stealing: bool,
}

impl WorkerDescriptor {
    /// Descriptor with the given thread name and default affinity and
    /// stealing settings.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for WorkerDescriptor {
    fn default() -> Self {
        Self {
            name: "JobSystemWorker".to_owned(),
            affinity: usize::MAX,
            enable_work_stealing: true,
        }
    }
}

/// Configuration for the job manager: one descriptor per worker thread,
/// plus an optional event sink.
#[derive(Debug, Clone, Default)]
pub struct JobManagerDescriptor {
    /// Configurations for all workers the manager should spawn.
    pub workers: Vec<WorkerDescriptor>,
    /// Sink receiving lifecycle events, typically a profiler.
    #[debug(skip)]
    pub observer: Option<Arc<dyn JobEventObserver>>,
}

impl JobManagerDescriptor {
    /// Descriptor with `count` identically configured workers.
    #[must_use]
    pub fn with_workers(count: usize) -> Self {
        Self {
            workers: (0..count).map(|_| WorkerDescriptor::default()).collect(),
            observer: None,
        }
    }
}
