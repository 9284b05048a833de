//! Taskpool demo runner
//!
//! Shows the embedding pattern: load configuration, initialize logging,
//! register a few representative background tasks, run them all, and log
//! the aggregate statistics.

use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskpool::{logging, AppConfig, Task, TaskError, TaskPriority, TaskScheduler};

#[tokio::main]
async fn main() -> taskpool::error::Result<()> {
    let config = AppConfig::load()?;
    config.scheduler.validate()?;
    logging::init_logging(&config.logging);

    let scheduler = TaskScheduler::new(config.scheduler.clone());
    scheduler.start();

    scheduler.add_task(
        Task::new("refresh-catalog", "Refresh catalog")
            .with_description("refetch the remote catalog into the local cache")
            .with_priority(TaskPriority::High)
            .with_execute(|ctx| async move {
                for step in 1..=4u8 {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    ctx.report_progress(step * 25);
                }
                Ok(json!({ "entries": 128 }))
            })
            .on_progress(|percent| tracing::info!(percent, "catalog refresh progress")),
    );

    scheduler.add_task(
        Task::new("sync-adapter", "Sync adapter")
            .with_data(json!({ "adapter": "files", "batch": 32 }))
            .with_timeout(Duration::from_secs(5))
            .with_execute(|ctx| async move {
                let batch = ctx
                    .data
                    .as_ref()
                    .and_then(|data| data.get("batch"))
                    .and_then(|batch| batch.as_u64())
                    .unwrap_or(16);
                tokio::time::sleep(Duration::from_millis(120)).await;
                Ok(json!({ "synced": batch }))
            }),
    );

    scheduler.add_task(
        Task::new("prune-temp", "Prune temp files")
            .with_priority(TaskPriority::Low)
            .with_execute(|_ctx| async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(json!({ "pruned": 7 }))
            }),
    );

    // succeeds on the second attempt to show the retry path
    let attempts = Arc::new(AtomicU32::new(0));
    scheduler.add_task(
        Task::new("flaky-upload", "Flaky upload")
            .with_retries(2)
            .with_execute(move |_ctx| {
                let attempts = Arc::clone(&attempts);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TaskError::failed("upstream hiccup"))
                    } else {
                        Ok(json!({ "uploaded": true }))
                    }
                }
            })
            .on_error(|err| tracing::warn!(%err, "upload gave up")),
    );

    scheduler.execute_all().await;

    let stats = scheduler.stats();
    tracing::info!(
        total = stats.total,
        completed = stats.completed,
        failed = stats.error,
        avg_ms = stats.avg_execution_time,
        "run finished"
    );

    scheduler.stop();
    Ok(())
}
