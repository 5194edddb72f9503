use std::sync::Arc;

use tracing::info;

use crate::scheduler::Scheduler;
use crate::tracker::Tracker;

const HEARTBEAT_CRON: &str = "0 0 * * * *";

/// Register built-in background tasks
pub async fn register_builtin_tasks(
    scheduler: &Scheduler,
    tracker: Arc<Tracker>,
) -> anyhow::Result<()> {
    // Heartbeat: hourly proof of life plus the number of open questions
    scheduler
        .add_cron_job(HEARTBEAT_CRON, "heartbeat", move || {
            let tracker = Arc::clone(&tracker);
            async move {
                let pending = tracker.pending_count().await;
                info!("Heartbeat: bot is alive, {} question(s) pending", pending);
            }
        })
        .await?;

    Ok(())
}
