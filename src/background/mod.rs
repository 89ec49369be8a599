use crate::{board::alerts::AlertFrequency, config::BackgroundConfig, context::AppContext, metrics};
use std::{future::Future, sync::Arc, time::Instant};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        let config = self.context.config.background.clone();
        if !config.enabled {
            info!("background jobs disabled");
            return;
        }
        info!("starting background job scheduler");

        tokio::spawn(Self::ban_expiry_job(Arc::clone(&self), config.clone()));
        tokio::spawn(Self::digest_job(
            Arc::clone(&self),
            config.clone(),
            AlertFrequency::Daily,
        ));
        tokio::spawn(Self::digest_job(
            Arc::clone(&self),
            config.clone(),
            AlertFrequency::Weekly,
        ));
        tokio::spawn(Self::health_check_job(Arc::clone(&self), config));

        info!("background jobs started");
    }

    /// Lift expired bans and suspensions (every 15 minutes by default)
    async fn ban_expiry_job(scheduler: Arc<Self>, config: BackgroundConfig) {
        let mut ticker = interval(Duration::from_secs(config.ban_expiry_interval));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match timed("expire_bans", tasks::expire_bans(&scheduler.context)).await {
                Ok(count) if count > 0 => info!(count, "lifted expired bans"),
                Ok(_) => debug!("ban expiry: nothing to lift"),
                Err(e) => error!(error = %e, "failed to expire bans"),
            }
        }
    }

    /// Look for due digests of one frequency (hourly by default)
    async fn digest_job(scheduler: Arc<Self>, config: BackgroundConfig, frequency: AlertFrequency) {
        let mut ticker = interval(Duration::from_secs(config.digest_check_interval));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let job_type = match frequency {
            AlertFrequency::Weekly => "weekly_digest",
            _ => "daily_digest",
        };

        loop {
            ticker.tick().await;

            match timed(job_type, tasks::send_digests(&scheduler.context, frequency)).await {
                Ok(count) if count > 0 => info!(count, frequency = %frequency, "sent alert digests"),
                Ok(_) => debug!(frequency = %frequency, "no digests due"),
                Err(e) => error!(error = %e, frequency = %frequency, "failed to send digests"),
            }
        }
    }

    /// Health check job (every 5 minutes by default)
    async fn health_check_job(scheduler: Arc<Self>, config: BackgroundConfig) {
        let mut ticker = interval(Duration::from_secs(config.health_check_interval));

        loop {
            ticker.tick().await;

            if let Err(e) = timed("health_check", tasks::health_check(&scheduler.context)).await {
                error!(error = %e, "health check failed");
            }
        }
    }
}

/// Run one task and record its outcome and duration
async fn timed<T, E>(job_type: &str, task: impl Future<Output = Result<T, E>>) -> Result<T, E> {
    let start = Instant::now();
    let result = task.await;
    let status = if result.is_ok() { "success" } else { "failure" };
    metrics::record_background_job(job_type, status, start.elapsed().as_secs_f64());
    result
}
