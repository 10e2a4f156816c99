//! Work-stealing job system with dependency chains.
//!
//! This crate provides a fixed-size pool of worker threads executing
//! short-lived jobs whose start order is constrained by a directed
//! acyclic dependency graph. It:
//! - Dispatches jobs round-robin onto per-worker queues and load-balances
//!   after the fact through cross-worker stealing.
//! - Gates each job on an outstanding-dependency counter plus readiness
//!   and cancellation flags, with carefully placed Release/Acquire
//!   orderings so a job observes all of its predecessors' writes.
//! - Wakes and sleeps workers through a single shared mutex/condvar pair,
//!   re-checking the pop predicate under the lock so no wakeup is lost.
//! - Lets submitting threads assist: running queued jobs inline instead
//!   of blocking while they wait for a target job or a full drain.
//!
//! Key modules:
//! - `config`: worker and manager descriptors.
//! - `manager`: the worker pool owner, round-robin dispatch, and the
//!   assist loops.
//! - `chain`: the fluent sequence/parallel/join builder compiling to a
//!   DAG over a bounded node arena.
//! - `state`: per-job readiness, completion, cancellation, and dependant
//!   bookkeeping.
//! - `event`: the lifecycle event stream and its observer trait.
//! - `profile`: an observer rendering per-worker ASCII timelines.
//!
//! Quick start:
//! 1. Build a [`config::JobManagerDescriptor`] with one
//!    [`config::WorkerDescriptor`] per desired thread and call
//!    [`manager::JobManager::create`].
//! 2. Describe the graph with a [`chain::JobChainBuilder`]: `do_job` for
//!    steps, `then` for edges, `together`/`close` for fan-out groups.
//! 3. Call `go` to ready the graph, then drain with
//!    `assist_and_wait_for_all` (or wait on individual handles).
//!
//! Jobs never start before `go`, a job's delegate runs exactly once, and
//! dependants of a cancelled job are still released so graphs always
//! drain.

#![warn(missing_docs)]

/// Fluent chain builder translating sequence/parallel/join grammar into
/// a job DAG.
pub mod chain;
/// Worker and manager configuration descriptors.
pub mod config;
/// Job lifecycle events, the observer trait, and run statistics.
pub mod event;
/// The job manager: worker pool ownership, dispatch, assist loops, and
/// shutdown.
pub mod manager;
#[cfg(not(feature = "loom"))]
mod platform;
#[cfg(not(feature = "loom"))]
pub mod profile;
mod queue;
mod signal;
/// Per-job shared state: readiness, completion, cancellation, and
/// dependants.
pub mod state;
mod sync;
/// Common aliases: job ids, delegates, and shared state handles.
pub mod types;
mod utils;
mod worker;
