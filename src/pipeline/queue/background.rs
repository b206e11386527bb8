//! Background queue worker.
//!
//! Spawns a thread that, every poll interval, releases stale claims and then
//! processes one batch. Sleeps in 5 second slices so shutdown is prompt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::core_state::CoreState;

/// Sleep granularity for shutdown responsiveness (5 seconds).
const SLEEP_GRANULARITY: Duration = Duration::from_secs(5);

/// Handle for the background queue worker thread.
///
/// Dropping the handle requests shutdown and joins the thread. An item that
/// is mid-generation finishes first.
pub struct QueueWorkerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl QueueWorkerHandle {
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for QueueWorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

pub fn start_queue_worker(state: Arc<CoreState>, interval: Duration) -> QueueWorkerHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!(interval_secs = interval.as_secs(), "Queue worker started");
        worker_loop(&state, interval, &flag);
        tracing::info!("Queue worker shutting down");
    });

    QueueWorkerHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn worker_loop(state: &CoreState, interval: Duration, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Relaxed) {
        if let Err(e) = run_once(state) {
            tracing::error!(error = %e, "Queue worker pass failed");
        }

        let mut slept = Duration::ZERO;
        while slept < interval {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            let step = SLEEP_GRANULARITY.min(interval - slept);
            std::thread::sleep(step);
            slept += step;
        }
    }
}

fn run_once(state: &CoreState) -> Result<(), String> {
    let conn = state.open_db().map_err(|e| e.to_string())?;
    let processor = state.processor();

    processor
        .recover_stale_claims(&conn, Utc::now())
        .map_err(|e| e.to_string())?;
    let outcome = processor
        .process_batch(&conn, processor.config().batch_size)
        .map_err(|e| e.to_string())?;

    if outcome.processed == 0 {
        tracing::debug!("Queue worker: nothing due");
    }
    Ok(())
}
