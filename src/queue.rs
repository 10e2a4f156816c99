use crate::types::{JobDelegate, JobHandle};
use derive_more::{Debug, Deref, DerefMut};
use std::collections::VecDeque;

/// One pending unit of work: the callable plus its shared state.
#[derive(Debug)]
pub(crate) struct JobEntry {
    #[debug(skip)]
    pub(crate) delegate: JobDelegate,
    pub(crate) state: JobHandle,
}

/// Per-worker ordered queue of pending jobs.
///
/// New entries go in at the front. Popping scans front to back because a
/// chain submits jobs in dependency order but readies them only once the
/// whole graph is built, so eligibility arrives in arbitrary order here.
#[derive(Debug, Default, Deref, DerefMut)]
pub(crate) struct JobQueue(VecDeque<JobEntry>);

impl JobQueue {
    pub(crate) fn push(&mut self, entry: JobEntry) {
        self.0.push_front(entry);
    }

    /// Removes and returns the first entry whose dependencies are met.
    ///
    /// Entries awaiting cancellation are marked done and erased in place.
    /// `saw_waiting` is set when an ineligible, non-cancelled entry was
    /// seen, distinguishing "nothing to do" from "nothing ready yet".
    pub(crate) fn pop_eligible(&mut self, saw_waiting: &mut bool) -> Option<JobEntry> {
        let mut index = 0;
        while index < self.0.len() {
            let candidate = &self.0[index].state;
            if candidate.awaiting_cancellation() {
                candidate.set_done();
                let _ = self.0.remove(index);
            } else if candidate.dependencies_met() {
                return self.0.remove(index);
            } else {
                *saw_waiting = true;
                index += 1;
            }
        }
        None
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::{signal::Signal, state::JobState};
    use std::sync::Arc;

    fn entry(signal: &Arc<Signal>) -> (JobEntry, JobHandle) {
        let state: JobHandle = Arc::new(JobState::new('\0', Arc::clone(signal)));
        let entry = JobEntry {
            delegate: Box::new(|| {}),
            state: Arc::clone(&state),
        };
        (entry, state)
    }

    #[test]
    fn scan_skips_past_entries_that_are_not_ready() {
        let signal = Arc::new(Signal::new());
        let mut queue = JobQueue::default();
        let (eligible, eligible_state) = entry(&signal);
        let (unready, _unready_state) = entry(&signal);
        eligible_state.set_ready();
        queue.push(eligible);
        queue.push(unready);

        let mut saw_waiting = false;
        let popped = queue.pop_eligible(&mut saw_waiting).expect("eligible entry");
        assert_eq!(popped.state.id(), eligible_state.id());
        assert!(saw_waiting);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn cancelled_entries_are_erased_and_marked_done() {
        let signal = Arc::new(Signal::new());
        let mut queue = JobQueue::default();
        let (cancelled, cancelled_state) = entry(&signal);
        cancelled_state.set_ready();
        cancelled_state.cancel();
        queue.push(cancelled);

        let mut saw_waiting = false;
        assert!(queue.pop_eligible(&mut saw_waiting).is_none());
        assert!(!saw_waiting);
        assert!(queue.is_empty());
        assert!(cancelled_state.is_done());
    }

    #[test]
    fn front_most_eligible_entry_wins() {
        let signal = Arc::new(Signal::new());
        let mut queue = JobQueue::default();
        let (older, older_state) = entry(&signal);
        let (newer, newer_state) = entry(&signal);
        older_state.set_ready();
        newer_state.set_ready();
        queue.push(older);
        queue.push(newer);

        let mut saw_waiting = false;
        let popped = queue.pop_eligible(&mut saw_waiting).expect("eligible entry");
        assert_eq!(popped.state.id(), newer_state.id());
    }
}
