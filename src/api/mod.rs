/// API routes and handlers
pub mod admin;
pub mod alerts;
pub mod applications;
pub mod auth;
pub mod health;
pub mod interviews;
pub mod jobs;
pub mod me;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod reports;

use crate::{config::ServerConfig, context::AppContext};
use axum::Router;

/// Build API routes
pub fn routes(config: &ServerConfig) -> Router<AppContext> {
    let upload_limit = config
        .storage
        .resume_upload_limit
        .max(config.storage.photo_upload_limit);

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(me::routes(upload_limit))
        .merge(jobs::routes())
        .merge(applications::routes())
        .merge(interviews::routes())
        .merge(alerts::routes())
        .merge(notifications::routes())
        .merge(messages::routes())
        .merge(reports::routes())
        .merge(admin::routes())
}
