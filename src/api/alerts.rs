/// Saved search endpoints
use crate::{
    auth::AuthContext,
    board::alerts::{AlertDraft, JobAlert},
    context::AppContext,
    error::BoardResult,
    ids::AlertId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/alerts", get(list_alerts).post(create_alert))
        .route(
            "/api/alerts/:id",
            put(update_alert).get(get_alert).delete(delete_alert),
        )
}

async fn list_alerts(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> BoardResult<Json<Vec<JobAlert>>> {
    Ok(Json(ctx.alerts.list(&auth.user).await?))
}

async fn create_alert(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(draft): Json<AlertDraft>,
) -> BoardResult<(StatusCode, Json<JobAlert>)> {
    let alert = ctx.alerts.create(&auth.user, draft).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

async fn get_alert(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<AlertId>,
) -> BoardResult<Json<JobAlert>> {
    Ok(Json(ctx.alerts.get(&auth.user, id).await?))
}

async fn update_alert(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<AlertId>,
    Json(draft): Json<AlertDraft>,
) -> BoardResult<Json<JobAlert>> {
    let alert = ctx.alerts.update(&auth.user, id, draft).await?;
    Ok(Json(alert))
}

async fn delete_alert(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<AlertId>,
) -> BoardResult<StatusCode> {
    ctx.alerts.delete(&auth.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
