#![cfg(not(feature = "loom"))]

use jobsys::{
    config::{JobManagerDescriptor, WorkerDescriptor},
    manager::{CreateError, JobManager},
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn create_rejects_an_empty_descriptor() {
    let err = JobManager::create(JobManagerDescriptor::default()).unwrap_err();
    assert_eq!(err, CreateError::NoWorkers);
}

#[test]
fn round_robin_spreads_jobs_evenly_without_stealing() {
    init_tracing();
    const WORKERS: usize = 4;
    const JOBS: usize = 10;

    let workers = (0..WORKERS)
        .map(|i| WorkerDescriptor {
            name: format!("rr-{i}"),
            enable_work_stealing: false,
            ..WorkerDescriptor::default()
        })
        .collect();
    let mut mgr = JobManager::create(JobManagerDescriptor {
        workers,
        observer: None,
    })
    .expect("manager");

    let per_thread: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
    let handles: Vec<_> = (0..JOBS)
        .map(|_| {
            let per_thread = Arc::clone(&per_thread);
            mgr.add_job(
                move || {
                    let name = std::thread::current()
                        .name()
                        .unwrap_or_default()
                        .to_owned();
                    *per_thread.lock().unwrap().entry(name).or_insert(0) += 1;
                },
                'r',
            )
        })
        .collect();
    for handle in &handles {
        handle.set_ready();
    }
    for handle in &handles {
        handle.wait(0);
    }
    mgr.shutdown(true);

    let per_thread = per_thread.lock().unwrap();
    assert_eq!(per_thread.len(), WORKERS);
    assert_eq!(per_thread.values().sum::<usize>(), JOBS);
    let mut counts: Vec<usize> = per_thread.values().copied().collect();
    counts.sort_unstable();
    assert_eq!(counts, [2, 2, 3, 3]);
}

#[test]
fn job_cancelled_before_any_pop_is_discarded() {
    let mut mgr =
        JobManager::create(JobManagerDescriptor::with_workers(1)).expect("manager");
    let ran = Arc::new(AtomicBool::new(false));
    let handle = {
        let ran = Arc::clone(&ran);
        mgr.add_job(move || ran.store(true, Ordering::Relaxed), 'c')
    };

    handle.cancel();
    handle.set_ready();
    handle.wait(0);
    mgr.shutdown(true);

    assert!(handle.is_done());
    assert!(!ran.load(Ordering::Relaxed));
}

#[test]
fn manually_wired_dependency_is_respected() {
    let mut mgr =
        JobManager::create(JobManagerDescriptor::with_workers(2)).expect("manager");
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let step = |tag: &'static str| {
        let order = Arc::clone(&order);
        move || order.lock().unwrap().push(tag)
    };

    let first = mgr.add_job(step("first"), 'a');
    let second = mgr.add_job(step("second"), 'b');
    first.add_dependant(&second);

    // Readying the dependant first must not let it run early.
    second.set_ready();
    first.set_ready();
    second.wait(0);
    mgr.shutdown(true);

    assert!(first.is_done());
    assert_eq!(*order.lock().unwrap(), ["first", "second"]);
    assert_eq!(mgr.active_workers(), 0);
}

#[test]
fn bounded_wait_returns_before_completion() {
    let mut mgr =
        JobManager::create(JobManagerDescriptor::with_workers(1)).expect("manager");
    let handle = mgr.add_job(|| std::thread::sleep(Duration::from_millis(200)), 'w');
    handle.set_ready();

    handle.wait(1_000);
    assert!(!handle.is_done());
    handle.wait(0);
    assert!(handle.is_done());
    mgr.shutdown(true);
}

#[test]
fn assist_until_job_done_runs_work_inline() {
    init_tracing();
    let mut mgr =
        JobManager::create(JobManagerDescriptor::with_workers(1)).expect("manager");

    // Occupy the only worker so the assist path has to run the target.
    let blocker = mgr.add_job(|| std::thread::sleep(Duration::from_millis(100)), 'B');
    blocker.set_ready();
    std::thread::sleep(Duration::from_millis(20));

    let target = mgr.add_job(|| {}, 't');
    target.set_ready();
    mgr.assist_until_job_done(&target);

    assert!(target.is_done());
    assert!(mgr.stats().jobs_assisted >= 1);
    mgr.shutdown(true);
}

#[test]
fn assist_until_done_drains_every_queue() {
    let mut mgr =
        JobManager::create(JobManagerDescriptor::with_workers(1)).expect("manager");

    let blocker = mgr.add_job(|| std::thread::sleep(Duration::from_millis(100)), 'B');
    blocker.set_ready();
    std::thread::sleep(Duration::from_millis(20));

    let handles: Vec<_> = (0..8)
        .map(|_| mgr.add_job(|| std::thread::sleep(Duration::from_millis(1)), 'q'))
        .collect();
    for handle in &handles {
        handle.set_ready();
    }
    mgr.assist_until_done();
    mgr.shutdown(true);

    for handle in &handles {
        assert!(handle.is_done());
    }
    let stats = mgr.stats();
    assert_eq!(stats.jobs_run, 9);
    assert!(stats.jobs_assisted >= 1);
    assert_eq!(stats.used_mask & 1, 1);
}

#[test]
fn shutdown_without_draining_abandons_unready_jobs() {
    let mut mgr =
        JobManager::create(JobManagerDescriptor::with_workers(2)).expect("manager");
    let ran = Arc::new(AtomicBool::new(false));
    let handle = {
        let ran = Arc::clone(&ran);
        mgr.add_job(move || ran.store(true, Ordering::Relaxed), 'x')
    };

    // Never readied; shutdown(false) drops the queued entry.
    mgr.shutdown(false);

    assert!(!handle.is_done());
    assert!(!ran.load(Ordering::Relaxed));
}
