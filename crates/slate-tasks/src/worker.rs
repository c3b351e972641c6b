//! Job worker with bounded retries.
//!
//! Each job runs on its own task so a job waiting out a backoff does not hold
//! up the rest of the queue. A job is attempted at most
//! `RetryPolicy::max_attempts()` times; after that it is logged and dropped.

use std::sync::Arc;

use metrics::counter;
use slate_core::RetryPolicy;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::job::{HandlerRegistry, Job, JobHandler};

pub struct TaskWorker {
    rx: Receiver<Job>,
    registry: HandlerRegistry,
    retry: RetryPolicy,
}

/// How a job finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
    Unhandled,
}

impl TaskWorker {
    pub fn new(rx: Receiver<Job>, registry: HandlerRegistry, retry: RetryPolicy) -> Self {
        Self {
            rx,
            registry,
            retry,
        }
    }

    /// Runs until `shutdown` fires or every sender is dropped.
    ///
    /// On shutdown the channel is closed to new submissions and every job
    /// already accepted is still dispatched, then in-flight jobs are awaited.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let handlers: Vec<_> = self.registry.job_names().collect();
        info!(handlers = ?handlers, "Task worker started");

        let mut in_flight = JoinSet::new();
        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            while in_flight.try_join_next().is_some() {}
            self.dispatch(job, &mut in_flight);
        }

        self.rx.close();
        let mut drained = 0usize;
        while let Some(job) = self.rx.recv().await {
            drained += 1;
            self.dispatch(job, &mut in_flight);
        }

        info!(drained, in_flight = in_flight.len(), "Task worker stopping");
        while in_flight.join_next().await.is_some() {}
    }

    fn dispatch(&self, job: Job, in_flight: &mut JoinSet<JobOutcome>) {
        match self.registry.get(&job.name) {
            Some(handler) => {
                let retry = self.retry;
                in_flight.spawn(async move { execute(handler, job, retry).await });
            }
            None => {
                warn!(job.id = %job.id, job.name = %job.name, "No handler registered, dropping job");
                counter!("task_jobs_total", "job" => job.name.clone(), "status" => "unhandled")
                    .increment(1);
            }
        }
    }
}

/// Runs one job to completion under the retry policy.
pub async fn execute(handler: Arc<dyn JobHandler>, job: Job, retry: RetryPolicy) -> JobOutcome {
    let mut attempt = 1;
    loop {
        match handler.handle(&job).await {
            Ok(()) => {
                counter!("task_jobs_total", "job" => job.name.clone(), "status" => "succeeded")
                    .increment(1);
                return JobOutcome::Succeeded { attempts: attempt };
            }
            Err(e) if attempt < retry.max_attempts() => {
                let delay = retry.delay_for(attempt);
                warn!(
                    job.id = %job.id,
                    job.name = %job.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Job failed, retrying"
                );
                counter!("task_jobs_total", "job" => job.name.clone(), "status" => "retried")
                    .increment(1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    job.id = %job.id,
                    job.name = %job.name,
                    attempts = attempt,
                    error = %e,
                    "Job failed permanently"
                );
                counter!("task_jobs_total", "job" => job.name.clone(), "status" => "failed")
                    .increment(1);
                return JobOutcome::Failed { attempts: attempt };
            }
        }
    }
}
