// src/parallel.rs

//! Concurrent fan-out of independent commands with a join-all barrier.
//!
//! Each job in a batch is one OS child process with a private stdout
//! buffer, so concurrent children never interleave output. Results are
//! always reported in submission order, never completion order, and the
//! batch is only returned once *every* job has finished; there is no
//! join-any or early-return path.
//!
//! There is no per-job timeout and no sibling cancellation: a hanging job
//! blocks the whole batch unless the caller wraps its invocation with
//! [`run_with_timeout`](crate::run_with_timeout) first.
//!
//! [`run_parallel`] fans out unbounded (one child per job, all at once),
//! which scales poorly for large batches. [`run_parallel_bounded`] caps
//! the number of simultaneously running children without changing the
//! join-all, order-preserving contract.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::errors::exit_codes;
use crate::exec::{OutputMode, ProcessHandle};
use crate::invocation::Invocation;

/// One invocation plus its position in the submitted batch.
#[derive(Debug, Clone)]
pub struct Job {
    pub index: usize,
    pub invocation: Invocation,
}

/// Outcome of one [`Job`].
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Submission index of the job this result belongs to.
    pub index: usize,
    /// Exit status, propagated verbatim; spawn failures report
    /// [`exit_codes::SPAWN_FAILED`].
    pub status: i32,
    /// The job's privately buffered stdout.
    pub stdout: String,
}

impl JobResult {
    pub fn success(&self) -> bool {
        self.status == exit_codes::SUCCESS
    }
}

/// Ordered, complete outcomes for a submitted batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Exactly one entry per submitted job, ordered by submission index.
    /// Partial batches are never returned.
    pub results: Vec<JobResult>,
    /// True iff every job exited 0. Trivially true for an empty batch.
    pub all_succeeded: bool,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Spawn every invocation concurrently and join all results.
///
/// Jobs are indexed by their position in `invocations`; that index keys
/// the corresponding [`JobResult`] regardless of completion order.
pub async fn run_parallel(invocations: Vec<Invocation>) -> BatchResult {
    dispatch(invocations, None).await
}

/// Like [`run_parallel`], but at most `max_concurrent` children run at
/// the same time. Submission-order results and the join-all barrier are
/// unchanged; only the fan-out is throttled.
pub async fn run_parallel_bounded(
    invocations: Vec<Invocation>,
    max_concurrent: usize,
) -> BatchResult {
    dispatch(invocations, Some(max_concurrent.max(1))).await
}

async fn dispatch(invocations: Vec<Invocation>, max_concurrent: Option<usize>) -> BatchResult {
    let jobs: Vec<Job> = invocations
        .into_iter()
        .enumerate()
        .map(|(index, invocation)| Job { index, invocation })
        .collect();
    debug!(
        jobs = jobs.len(),
        max_concurrent, "dispatching parallel batch"
    );

    let semaphore = max_concurrent.map(|limit| Arc::new(Semaphore::new(limit)));

    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let semaphore = semaphore.clone();
        let index = job.index;
        handles.push((
            index,
            tokio::spawn(async move {
                // Holding the permit for the job's whole lifetime bounds
                // the number of live children. The semaphore is never
                // closed, so acquisition cannot fail.
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                run_job(job).await
            }),
        ));
    }

    // Join-all barrier: await every task, in submission order.
    let mut results = Vec::with_capacity(handles.len());
    for (index, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(err) => {
                error!(index, error = %err, "batch job task failed to join");
                results.push(JobResult {
                    index,
                    status: exit_codes::SPAWN_FAILED,
                    stdout: String::new(),
                });
            }
        }
    }

    let all_succeeded = results.iter().all(JobResult::success);
    debug!(jobs = results.len(), all_succeeded, "parallel batch complete");
    BatchResult {
        results,
        all_succeeded,
    }
}

async fn run_job(job: Job) -> JobResult {
    debug!(index = job.index, cmd = %job.invocation, "starting batch job");

    let handle = match ProcessHandle::spawn(&job.invocation, OutputMode::Capture) {
        Ok(handle) => handle,
        Err(err) => {
            error!(
                index = job.index,
                cmd = %job.invocation,
                error = %err,
                "batch job failed to spawn"
            );
            return JobResult {
                index: job.index,
                status: err.as_exit_code(),
                stdout: String::new(),
            };
        }
    };

    match handle.wait_with_output().await {
        Ok((status, stdout)) => {
            debug!(index = job.index, exit_code = status, "batch job exited");
            JobResult {
                index: job.index,
                status,
                stdout,
            }
        }
        Err(err) => {
            error!(index = job.index, error = %err, "batch job wait failed");
            JobResult {
                index: job.index,
                status: err.as_exit_code(),
                stdout: String::new(),
            }
        }
    }
}
