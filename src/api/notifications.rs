/// In-app notifications and channel preferences
use crate::{
    auth::AuthContext,
    context::AppContext,
    error::BoardResult,
    ids::NotificationId,
    notify::{ChannelSet, EventKind, Notification, NotificationFilter, NotificationPreferences},
    pagination::{Page, PageParams},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread", get(unread_count))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route(
            "/api/notifications/preferences",
            get(get_preferences).put(update_preferences),
        )
        .route("/api/notifications/:id/read", post(mark_read))
}

async fn list_notifications(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(page): Query<PageParams>,
    Query(filter): Query<NotificationFilter>,
) -> BoardResult<Json<Page<Notification>>> {
    let notifications = ctx
        .notifications
        .list(auth.user_id(), filter, page)
        .await?;
    Ok(Json(notifications))
}

#[derive(Serialize)]
struct CountResponse {
    count: i64,
}

async fn unread_count(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> BoardResult<Json<CountResponse>> {
    let count = ctx.notifications.unread_count(auth.user_id()).await?;
    Ok(Json(CountResponse { count }))
}

async fn mark_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<NotificationId>,
) -> BoardResult<StatusCode> {
    ctx.notifications.mark_read(auth.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct MarkedResponse {
    marked: u64,
}

async fn mark_all_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> BoardResult<Json<MarkedResponse>> {
    let marked = ctx.notifications.mark_all_read(auth.user_id()).await?;
    Ok(Json(MarkedResponse { marked }))
}

async fn get_preferences(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> BoardResult<Json<NotificationPreferences>> {
    Ok(Json(ctx.preferences.load(auth.user_id()).await?))
}

/// `{"channels": {"job_approved": {"mail": false, "in_app": true}}}`
///
/// Kinds left out keep their current channels.
#[derive(Deserialize)]
struct PreferencesUpdate {
    channels: HashMap<EventKind, ChannelSet>,
}

async fn update_preferences(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(update): Json<PreferencesUpdate>,
) -> BoardResult<Json<NotificationPreferences>> {
    for (kind, channels) in update.channels {
        ctx.preferences.set(auth.user_id(), kind, channels).await?;
    }
    Ok(Json(ctx.preferences.load(auth.user_id()).await?))
}
