/// Background task implementations
use crate::{board::alerts::AlertFrequency, context::AppContext, error::BoardResult, metrics};
use chrono::Utc;
use serde::Serialize;

/// Lift bans and suspensions whose end date has passed
pub async fn expire_bans(ctx: &AppContext) -> BoardResult<usize> {
    ctx.moderation.expire_bans(Utc::now()).await
}

/// Send the due digests of one frequency
pub async fn send_digests(ctx: &AppContext, frequency: AlertFrequency) -> BoardResult<usize> {
    ctx.alerts.send_digests(frequency, Utc::now()).await
}

/// Moderation backlog published as gauges
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueDepths {
    pub pending_jobs: i64,
    pub pending_reports: i64,
}

/// Verify the database answers and refresh the backlog gauges
pub async fn health_check(ctx: &AppContext) -> BoardResult<QueueDepths> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    let stats = ctx.reports.stats().await?;
    metrics::set_queue_depths(stats.pending_jobs, stats.pending_reports);

    Ok(QueueDepths {
        pending_jobs: stats.pending_jobs,
        pending_reports: stats.pending_reports,
    })
}
