use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub payload: Value,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(name: &str, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            payload,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task queue is full, dropped job {0}")]
    QueueFull(String),

    #[error("task queue is closed")]
    Closed,
}

/// Submission point for background jobs.
pub trait TaskSink: Send + Sync {
    /// Enqueues a job without waiting for it to run.
    fn submit(&self, job_name: &str, payload: Value) -> Result<JobId, TaskError>;
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// An error makes the worker retry the job until its attempt budget runs out.
    async fn handle(&self, job: &Job) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, job_name: &str, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(job_name.to_string(), handler);
        self
    }

    pub fn get(&self, job_name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_name).cloned()
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
