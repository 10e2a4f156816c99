//! ASCII-timeline profiling observer.
//!
//! One implementation of [`JobEventObserver`]; the scheduler core never
//! references it. Install it via
//! [`JobManagerDescriptor::observer`](crate::config::JobManagerDescriptor)
//! and render with [`ProfilingObserver::dump`] once the graph has
//! drained.

use crate::{
    config::WorkerDescriptor,
    event::{JobEvent, JobEventObserver},
    types::{JobHandle, JobId},
};
use core::fmt::Write as _;
use parking_lot::Mutex;
use std::time::Instant;

/// Fallback glyphs for untagged jobs.
const BUSY_SYMBOLS: &[u8] = b"abcdefghijklmn";
/// Width of one rendered timeline row, label included.
const ROW_WIDTH: usize = 200;

#[derive(Debug, Clone, Copy)]
struct TimelineEntry {
    job_id: JobId,
    debug_tag: char,
    start: Instant,
    end: Option<Instant>,
}

#[derive(Debug, Default)]
struct Timeline {
    entries: Vec<TimelineEntry>,
}

/// Records per-worker job timelines plus a synthetic lane for assisting
/// threads, and renders them as a proportional ASCII chart.
///
/// Each worker's lane is written only by that worker, and the assist
/// lane only by assisting callers, so the per-lane locks are
/// uncontended.
pub struct ProfilingObserver {
    lane_names: Vec<String>,
    first_pop: Mutex<Option<Instant>>,
    timelines: Vec<Mutex<Timeline>>,
}

impl ProfilingObserver {
    /// Observer with one lane per worker descriptor plus the assist
    /// lane.
    #[must_use]
    pub fn for_workers(workers: &[WorkerDescriptor]) -> Self {
        let mut lane_names: Vec<String> =
            workers.iter().map(|worker| worker.name.clone()).collect();
        lane_names.push("[Assist]".to_owned());
        let timelines = lane_names
            .iter()
            .map(|_| Mutex::new(Timeline::default()))
            .collect();
        Self {
            lane_names,
            first_pop: Mutex::new(None),
            timelines,
        }
    }

    /// Renders one row per lane, each job drawn proportionally between
    /// the first pop observed and now. Returns an empty string when no
    /// job was ever popped.
    #[must_use]
    pub fn dump(&self) -> String {
        let Some(origin) = *self.first_pop.lock() else {
            return String::new();
        };
        let total_ns = origin.elapsed().as_nanos().max(1);

        let mut out = String::new();
        for (name, timeline) in self.lane_names.iter().zip(&self.timelines) {
            let label = format!("{name:>20}: ");
            let width = ROW_WIDTH.saturating_sub(label.len()).max(1);
            let mut row = vec![b'-'; width];

            for entry in &timeline.lock().entries {
                let Some(end) = entry.end else { continue };
                let clamp = |instant: Instant| -> usize {
                    let ns = instant.duration_since(origin).as_nanos();
                    ((ns * width as u128 / total_ns) as usize).min(width - 1)
                };
                let glyph = if entry.debug_tag != '\0' {
                    entry.debug_tag as u8
                } else {
                    BUSY_SYMBOLS[entry.job_id as usize % BUSY_SYMBOLS.len()]
                };

                let start_index = clamp(entry.start);
                let mut end_index = clamp(end);
                // Shift right past glyphs already drawn, so overlapping
                // short jobs stay visible.
                let mut shift = 0;
                while start_index + shift < width - 1
                    && end_index + shift < width - 1
                    && row[start_index + shift] != b'-'
                {
                    shift += 1;
                }
                end_index -= (end_index - start_index).min(shift);
                for cell in &mut row[start_index + shift..=end_index + shift] {
                    *cell = glyph;
                }
            }

            let _ = writeln!(out, "{label}{}", String::from_utf8_lossy(&row));
        }
        out
    }
}

impl JobEventObserver for ProfilingObserver {
    fn observe(&self, event: JobEvent, worker: usize, job: Option<&JobHandle>) {
        match event {
            JobEvent::Popped => {
                let mut first_pop = self.first_pop.lock();
                if first_pop.is_none() {
                    *first_pop = Some(Instant::now());
                }
            }
            JobEvent::Start => {
                let (Some(job), Some(timeline)) = (job, self.timelines.get(worker)) else {
                    return;
                };
                timeline.lock().entries.push(TimelineEntry {
                    job_id: job.id(),
                    debug_tag: job.debug_tag(),
                    start: Instant::now(),
                    end: None,
                });
            }
            JobEvent::Done => {
                let Some(timeline) = self.timelines.get(worker) else {
                    return;
                };
                if let Some(entry) = timeline.lock().entries.last_mut() {
                    entry.end = Some(Instant::now());
                }
            }
            _ => {}
        }
    }
}
