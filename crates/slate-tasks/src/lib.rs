//! # Slate Tasks
//!
//! Asynchronous job submission for the Slate API.
//!
//! Producers only see [`TaskSink`]: `submit` never blocks and never waits for
//! the job to run. The [`TaskWorker`] owns delivery, including retries with
//! exponential backoff.
//!
//! # Example
//!
//! ```ignore
//! use slate_tasks::{HandlerRegistry, TaskQueue, TaskWorker};
//!
//! let (queue, receiver) = TaskQueue::new(1024);
//! let registry = HandlerRegistry::new().register("notifications.enrollment_notice", handler);
//! tokio::spawn(TaskWorker::new(receiver, registry, retry_policy).run(shutdown.clone()));
//!
//! queue.submit("notifications.enrollment_notice", payload)?;
//! ```

pub mod job;
pub mod queue;
pub mod recording;
pub mod worker;

pub use job::{HandlerRegistry, Job, JobHandler, JobId, TaskError, TaskSink};
pub use queue::TaskQueue;
pub use recording::RecordingSink;
pub use worker::TaskWorker;
