/// Job board server entry point
use anyhow::Context;
use jobboard::{background::JobScheduler, config::ServerConfig, server, AppContext};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    init_logging(&config);

    let ctx = AppContext::new(config)
        .await
        .context("failed to initialize application context")?;
    let ctx = Arc::new(ctx);

    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await.context("server exited")?;

    Ok(())
}

fn init_logging(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("jobboard={},tower_http=info", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
