//! Durable insight processing queue.
//!
//! Items are claimed with a compare-and-set on `started_at`, run through the
//! [`InsightGenerator`](crate::pipeline::insights::InsightGenerator), then
//! completed, rescheduled with exponential backoff, or failed terminally once
//! `retry_count` reaches `max_retries`.

pub mod background;
pub mod processor;

pub use background::{start_queue_worker, QueueWorkerHandle};
pub use processor::{BatchOutcome, ItemOutcome, QueueConfig, QueueProcessor, QueueStatus};

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::pipeline::insights::InsightError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Insight generation failed: {0}")]
    Generation(#[from] InsightError),

    #[error("Report not found: {0}")]
    ReportNotFound(Uuid),

    #[error("Invalid queue request: {0}")]
    Validation(String),
}
