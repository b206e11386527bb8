use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use super::QueueError;
use crate::db;
use crate::models::{InsightGenerationResult, InsightType, QueueCounts, QueueItem, QueueItemSummary};
use crate::pipeline::insights::{InsightError, InsightGenerator};

/// Items shown by [`QueueProcessor::queue_status`].
pub const RECENT_ITEMS_LIMIT: u32 = 50;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub batch_size: u32,
    pub max_retries: u32,
    /// First retry waits `base_backoff * 2`, then doubles per retry.
    pub base_backoff: Duration,
    pub stale_claim_after: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            max_retries: 3,
            base_backoff: Duration::from_secs(60),
            stale_claim_after: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub queue_id: Uuid,
    pub report_id: Uuid,
    pub success: bool,
    pub insight_results: Vec<InsightGenerationResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub processed: u32,
    pub successful: u32,
    pub failed: u32,
    pub results: Vec<ItemOutcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub stats: QueueCounts,
    pub items: Vec<QueueItemSummary>,
}

pub struct QueueProcessor {
    generator: Arc<InsightGenerator>,
    config: QueueConfig,
}

impl QueueProcessor {
    pub fn new(generator: Arc<InsightGenerator>, config: QueueConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add deferred work for an existing report.
    pub fn enqueue(
        &self,
        conn: &Connection,
        report_id: &Uuid,
        insight_types: &[InsightType],
        priority: i64,
    ) -> Result<QueueItem, QueueError> {
        if insight_types.is_empty() {
            return Err(QueueError::Validation("insightTypes must not be empty".into()));
        }
        if !db::report_exists(conn, report_id)? {
            return Err(QueueError::ReportNotFound(*report_id));
        }

        let now = Utc::now();
        let item = QueueItem {
            id: Uuid::new_v4(),
            report_id: *report_id,
            insight_types: insight_types.to_vec(),
            priority,
            scheduled_for: now,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries: self.config.max_retries,
            error_message: None,
            created_at: now,
        };
        db::insert_queue_item(conn, &item)?;

        tracing::info!(
            queue_item_id = %item.id,
            report_id = %report_id,
            types = insight_types.len(),
            priority,
            "Queued insight generation"
        );
        Ok(item)
    }

    pub fn queue_status(&self, conn: &Connection) -> Result<QueueStatus, QueueError> {
        Ok(QueueStatus {
            stats: db::queue_counts(conn)?,
            items: db::recent_queue_items(conn, RECENT_ITEMS_LIMIT)?,
        })
    }

    /// Return abandoned claims to pending.
    pub fn recover_stale_claims(&self, conn: &Connection, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let max_age = chrono::Duration::from_std(self.config.stale_claim_after)
            .unwrap_or_else(|_| chrono::Duration::minutes(30));
        let released = db::recover_stale_claims(conn, now - max_age)?;
        if released > 0 {
            tracing::warn!(released, "Released stale queue claims");
        }
        Ok(released)
    }

    pub fn process_batch(&self, conn: &Connection, batch_size: u32) -> Result<BatchOutcome, QueueError> {
        self.process_batch_at(conn, Utc::now(), batch_size)
    }

    /// Claim and run up to `batch_size` items due at `due_by`, one at a time.
    ///
    /// Claims and reschedules are stamped with the wall clock at the moment
    /// they happen. An item whose run hits a store error is failed through the
    /// normal retry path and the batch moves on.
    pub fn process_batch_at(
        &self,
        conn: &Connection,
        due_by: DateTime<Utc>,
        batch_size: u32,
    ) -> Result<BatchOutcome, QueueError> {
        let candidates = db::select_claimable(conn, due_by, batch_size)?;
        let mut outcome = BatchOutcome::default();

        for item in candidates {
            match db::claim_queue_item(conn, &item.id, Utc::now()) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(queue_item_id = %item.id, "Queue item claimed elsewhere, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::error!(queue_item_id = %item.id, error = %e, "Failed to claim queue item");
                    continue;
                }
            }

            let result = match self.process_item(conn, &item) {
                Ok(result) => result,
                Err(e) => self.abandon_item(conn, &item, &e),
            };
            outcome.processed += 1;
            if result.success {
                outcome.successful += 1;
            } else {
                outcome.failed += 1;
            }
            outcome.results.push(result);
        }

        if outcome.processed > 0 {
            tracing::info!(
                processed = outcome.processed,
                successful = outcome.successful,
                failed = outcome.failed,
                "Queue batch finished"
            );
        }
        Ok(outcome)
    }

    /// Best-effort failure bookkeeping after a store error mid-item.
    fn abandon_item(&self, conn: &Connection, item: &QueueItem, error: &QueueError) -> ItemOutcome {
        let message = error.to_string();
        tracing::error!(queue_item_id = %item.id, error = %message, "Queue item aborted by store error");
        if let Err(e) = self.record_failure(conn, item, &item.insight_types, &message) {
            tracing::error!(queue_item_id = %item.id, error = %e, "Could not record queue item failure");
        }
        ItemOutcome {
            queue_id: item.id,
            report_id: item.report_id,
            success: false,
            insight_results: Vec::new(),
            error: Some(message),
        }
    }

    fn process_item(&self, conn: &Connection, item: &QueueItem) -> Result<ItemOutcome, QueueError> {
        tracing::info!(queue_item_id = %item.id, report_id = %item.report_id, "Processing queue item");

        match self.generator.generate_insights_for_report(conn, &item.report_id, &item.insight_types) {
            Ok(results) => {
                let failed_types: Vec<InsightType> =
                    results.iter().filter(|r| !r.success).map(|r| r.insight_type).collect();

                if failed_types.is_empty() {
                    db::complete_queue_item(conn, &item.id, Utc::now())?;
                    db::mark_report_processed(conn, &item.report_id)?;
                    return Ok(ItemOutcome {
                        queue_id: item.id,
                        report_id: item.report_id,
                        success: true,
                        insight_results: results,
                        error: None,
                    });
                }

                let names: Vec<&str> = failed_types.iter().map(|t| t.as_str()).collect();
                let message = format!("Failed insight types: {}", names.join(", "));
                self.record_failure(conn, item, &failed_types, &message)?;
                Ok(ItemOutcome {
                    queue_id: item.id,
                    report_id: item.report_id,
                    success: false,
                    insight_results: results,
                    error: Some(message),
                })
            }
            Err(InsightError::Database(e)) => Err(QueueError::Database(e)),
            Err(e) => {
                let message = e.to_string();
                self.record_failure(conn, item, &item.insight_types, &message)?;
                Ok(ItemOutcome {
                    queue_id: item.id,
                    report_id: item.report_id,
                    success: false,
                    insight_results: Vec::new(),
                    error: Some(message),
                })
            }
        }
    }

    /// Increment the retry count and either reschedule or fail terminally.
    fn record_failure(
        &self,
        conn: &Connection,
        item: &QueueItem,
        remaining: &[InsightType],
        message: &str,
    ) -> Result<(), QueueError> {
        let retry_count = item.retry_count + 1;
        if retry_count >= item.max_retries {
            db::fail_queue_item(conn, &item.id, remaining, retry_count, message)?;
            tracing::error!(
                queue_item_id = %item.id,
                retry_count,
                error = %message,
                "Queue item failed permanently"
            );
            return Ok(());
        }

        let next = Utc::now() + self.backoff(retry_count);
        db::reschedule_queue_item(conn, &item.id, remaining, retry_count, next, message)?;
        tracing::warn!(
            queue_item_id = %item.id,
            retry_count,
            scheduled_for = %next,
            error = %message,
            "Queue item rescheduled"
        );
        Ok(())
    }

    /// `base_backoff * 2^retry_count`, using the already incremented count.
    pub fn backoff(&self, retry_count: u32) -> chrono::Duration {
        let base = chrono::Duration::from_std(self.config.base_backoff).unwrap_or_else(|_| chrono::Duration::seconds(60));
        base * 2_i32.saturating_pow(retry_count.min(16))
    }
}
