#![cfg(not(feature = "loom"))]

use jobsys::{chain::JobChainBuilder, config::JobManagerDescriptor, manager::JobManager};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

const GROUP_SIZE: usize = 1_000;

#[test]
fn wide_group_runs_every_job_exactly_once() {
    let mut mgr =
        JobManager::create(JobManagerDescriptor::with_workers(8)).expect("manager");
    let executed = Arc::new(AtomicUsize::new(0));
    let seen_by_successor = Arc::new(AtomicUsize::new(0));

    {
        let mut builder = JobChainBuilder::<1_100>::new(&mgr);
        builder.do_job(|| {}, 'a').then().together('G');
        for i in 0..GROUP_SIZE {
            let executed = Arc::clone(&executed);
            let tag = (b'A' + (i % 26) as u8) as char;
            builder.do_job(
                move || {
                    executed.fetch_add(1, Ordering::Relaxed);
                },
                tag,
            );
        }
        let observe = {
            let executed = Arc::clone(&executed);
            let seen_by_successor = Arc::clone(&seen_by_successor);
            move || seen_by_successor.store(executed.load(Ordering::Relaxed), Ordering::Relaxed)
        };
        builder
            .close()
            .then()
            .do_job(observe, 'F')
            .go()
            .assist_and_wait_for_all();
        assert!(!builder.failed());
    }
    mgr.shutdown(true);

    assert_eq!(executed.load(Ordering::Relaxed), GROUP_SIZE);
    // The join gated the successor until the whole group completed.
    assert_eq!(seen_by_successor.load(Ordering::Relaxed), GROUP_SIZE);
    // Lead step + join + group members + successor, each exactly once.
    assert_eq!(mgr.stats().jobs_run, GROUP_SIZE + 3);
}
