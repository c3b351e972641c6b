use serde_json::Value;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::debug;

use crate::job::{Job, JobId, TaskError, TaskSink};

/// In-process job queue backed by a bounded channel.
#[derive(Clone, Debug)]
pub struct TaskQueue {
    tx: Sender<Job>,
}

impl TaskQueue {
    /// Returns the queue and the receiving end to hand to a
    /// [`TaskWorker`](crate::TaskWorker).
    pub fn new(capacity: usize) -> (Self, Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl TaskSink for TaskQueue {
    fn submit(&self, job_name: &str, payload: Value) -> Result<JobId, TaskError> {
        let job = Job::new(job_name, payload);
        let id = job.id;

        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => TaskError::QueueFull(job.name),
            TrySendError::Closed(_) => TaskError::Closed,
        })?;

        debug!(job.id = %id, job.name = %job_name, "Job submitted");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_submit_delivers_job() {
        let (queue, mut rx) = TaskQueue::new(4);
        let id = queue.submit("reports.build", json!({ "n": 1 })).unwrap();

        let job = rx.recv().await.unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.name, "reports.build");
        assert_eq!(job.payload["n"], 1);
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let (queue, _rx) = TaskQueue::new(1);
        queue.submit("a", json!({})).unwrap();

        let err = queue.submit("b", json!({})).unwrap_err();
        assert!(matches!(err, TaskError::QueueFull(name) if name == "b"));
    }

    #[test]
    fn test_closed_queue() {
        let (queue, rx) = TaskQueue::new(1);
        drop(rx);
        assert!(matches!(queue.submit("a", json!({})), Err(TaskError::Closed)));
    }
}
