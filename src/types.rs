use crate::state::JobState;
use std::sync::Arc;

/// Callable payload of a job.
///
/// Runs to completion on whichever thread pops it; the system never
/// interrupts a delegate, and the delegate's own errors are opaque to the
/// scheduler.
pub type JobDelegate = Box<dyn FnOnce() + Send + 'static>;

/// Monotonically assigned job identifier, unique within a process run.
///
/// Diagnostic only; used by profiling displays.
pub type JobId = u64;

/// Shared handle to a job's state.
///
/// Held by the chain builder, by the queue entry on exactly one worker,
/// and by every predecessor's dependants list; the state is released when
/// the last holder drops it. Edges only flow forward, so no cycles are
/// possible.
pub type JobHandle = Arc<JobState>;
