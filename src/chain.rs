use crate::{manager::JobManager, types::JobHandle};
use core::array;
use std::sync::Arc;
use tracing::warn;

/// One slot in the builder's node arena.
#[derive(Debug, Default)]
struct Node {
    job: Option<JobHandle>,
    is_group: bool,
    /// Node promoted by `then` just before this group opened; every step
    /// inside the group takes it as a predecessor.
    group_dependency: Option<usize>,
}

/// Fluent constructor for job DAGs.
///
/// Grammar: a chain is a sequence of `do_job`, `then`, and
/// `together .. close` groups, ended by `go`:
///
/// ```text
/// builder
///     .do_job(something, 'a')
///     .then()
///     .together('g')
///         .do_job(thing_1, '1')
///         .do_job(thing_2, '2')
///         .do_job(thing_3, '3')
///     .close()
///     .then()
///     .do_job(final_stuff, 'f')
///     .go();
/// ```
///
/// builds
///
/// ```text
///              --- thing_1 ---
///             /               \
/// something -> --- thing_2 ---- -> final_stuff
///             \               /
///              --- thing_3 ---
/// ```
///
/// Each group joins on a no-op job, so a `then` after `close` attaches
/// the successor with a single edge rather than one per group member.
///
/// Nodes come from a fixed arena of `MAX_NODES` slots (steps, groups,
/// and one sentinel); overflow cancels every job built so far, turns the
/// remaining verbs into no-ops, and surfaces through
/// [`failed`](JobChainBuilder::failed). The arena lives inline, so the
/// memory cost per graph is deterministic. The only necessary output of
/// the builder is jobs; nodes are purely internal.
#[must_use]
pub struct JobChainBuilder<'a, const MAX_NODES: usize> {
    manager: &'a JobManager,
    nodes: [Node; MAX_NODES],
    next_node: usize,
    /// Group nesting, bottomed by a sentinel pushed at construction.
    stack: Vec<usize>,
    /// Every job submitted by this builder, readied in order by `go`.
    all_jobs: Vec<JobHandle>,
    /// Most recently added node; source of the next `then` edge.
    last: Option<usize>,
    /// Node promoted by `then` to precede the next `do_job` or
    /// `together`.
    dependency: Option<usize>,
    failed: bool,
}

impl<'a, const MAX_NODES: usize> JobChainBuilder<'a, MAX_NODES> {
    /// Builder submitting jobs to `manager`.
    pub fn new(manager: &'a JobManager) -> Self {
        let mut builder = Self {
            manager,
            nodes: array::from_fn(|_| Node::default()),
            next_node: 0,
            stack: Vec::new(),
            all_jobs: Vec::new(),
            last: None,
            dependency: None,
            failed: false,
        };
        match builder.alloc_node() {
            Some(root) => builder.stack.push(root),
            None => builder.fail_chain(),
        }
        builder
    }

    fn alloc_node(&mut self) -> Option<usize> {
        if self.next_node >= MAX_NODES {
            return None;
        }
        let index = self.next_node;
        self.next_node += 1;
        self.nodes[index] = Node::default();
        Some(index)
    }

    fn job_at(&self, index: usize) -> &JobHandle {
        self.nodes[index]
            .job
            .as_ref()
            .expect("JobChainBuilder: cursor points at a node without a job")
    }

    /// Adds a step running `delegate`.
    ///
    /// The step follows whatever `then` promoted; inside a group it also
    /// feeds the group's join job and inherits the group's predecessor.
    pub fn do_job(
        &mut self,
        delegate: impl FnOnce() + Send + 'static,
        debug_tag: char,
    ) -> &mut Self {
        if self.failed {
            return self;
        }
        let owner = self.stack.last().copied();
        let Some(index) = self.alloc_node() else {
            self.fail_chain();
            return self;
        };
        let job = self.manager.add_job(delegate, debug_tag);
        self.all_jobs.push(Arc::clone(&job));

        if let Some(dependency) = self.dependency.take() {
            self.job_at(dependency).add_dependant(&job);
        }
        if let Some(owner) = owner {
            if self.nodes[owner].is_group {
                job.add_dependant(self.job_at(owner));
                if let Some(group_dependency) = self.nodes[owner].group_dependency {
                    self.job_at(group_dependency).add_dependant(&job);
                }
            }
        }

        self.nodes[index].job = Some(job);
        self.last = Some(index);
        self
    }

    /// Opens a parallel group.
    ///
    /// Steps added until the matching `close` carry no ordering between
    /// one another and join on a no-op job tagged `debug_tag`.
    pub fn together(&mut self, debug_tag: char) -> &mut Self {
        if self.failed {
            return self;
        }
        let Some(index) = self.alloc_node() else {
            self.fail_chain();
            return self;
        };
        let join = self.manager.add_job(|| {}, debug_tag);
        self.all_jobs.push(Arc::clone(&join));
        self.nodes[index].is_group = true;
        self.nodes[index].group_dependency = self.dependency.take();
        self.nodes[index].job = Some(join);
        self.last = Some(index);
        self.stack.push(index);
        self
    }

    /// Promotes the previous step or group to be the predecessor of
    /// whatever comes next.
    pub fn then(&mut self) -> &mut Self {
        self.dependency = self.last;
        // `last` falls back to the promoted node's group, so a further
        // `then` that exits the group chains from the group itself rather
        // than from its final inner step.
        self.last = self
            .dependency
            .and_then(|index| self.nodes[index].group_dependency);
        self
    }

    /// Closes the innermost group, making it the target of a following
    /// `then`.
    pub fn close(&mut self) -> &mut Self {
        if let Some(&owner) = self.stack.last() {
            if self.nodes[owner].is_group {
                self.last = Some(owner);
            }
        }
        self.dependency = None;
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        self
    }

    /// Readies every job built so far; the DAG starts executing.
    pub fn go(&mut self) -> &mut Self {
        for job in &self.all_jobs {
            job.set_ready();
        }
        self
    }

    /// Cancels every job built so far and marks the chain failed.
    pub fn fail(&mut self) -> &mut Self {
        self.fail_chain();
        self
    }

    fn fail_chain(&mut self) {
        if !self.failed {
            warn!(
                jobs = self.all_jobs.len(),
                "job chain failed; cancelling all submitted jobs"
            );
        }
        for job in &self.all_jobs {
            job.cancel();
        }
        self.failed = true;
    }

    /// Whether the chain overflowed its arena or was explicitly failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Runs jobs on the calling thread until every worker queue drains.
    pub fn assist_and_wait_for_all(&mut self) -> &mut Self {
        self.manager.assist_until_done();
        self
    }
}
