use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use crate::job::{Job, JobId, TaskError, TaskSink};

/// A sink that keeps submitted jobs in memory instead of running them.
/// Used by tests and by tooling that only needs to see what would be sent.
#[derive(Default)]
pub struct RecordingSink {
    jobs: Mutex<Vec<Job>>,
    reject: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every submission fails with [`TaskError::Closed`].
    pub fn set_rejecting(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }

    pub fn jobs_named(&self, job_name: &str) -> Vec<Job> {
        self.jobs()
            .into_iter()
            .filter(|job| job.name == job_name)
            .collect()
    }
}

impl TaskSink for RecordingSink {
    fn submit(&self, job_name: &str, payload: Value) -> Result<JobId, TaskError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(TaskError::Closed);
        }
        let job = Job::new(job_name, payload);
        let id = job.id;
        self.jobs
            .lock()
            .map_err(|_| TaskError::Closed)?
            .push(job);
        Ok(id)
    }
}
