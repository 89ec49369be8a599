/// Interview scheduling endpoints
use crate::{
    api::middleware::OptionalJson,
    auth::AuthContext,
    board::interviews::{InterviewDetails, InterviewInvitation, InterviewResponse, RescheduleRequest},
    context::AppContext,
    error::BoardResult,
    ids::{ApplicationId, InterviewId},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/applications/:id/interviews",
            get(list_interviews).post(schedule),
        )
        .route("/api/interviews/:id", get(get_interview))
        .route("/api/interviews/:id/cancel", post(cancel))
        .route("/api/interviews/:id/reschedule", post(reschedule))
        .route("/api/interviews/:id/respond", post(respond))
}

async fn schedule(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(application_id): Path<ApplicationId>,
    Json(details): Json<InterviewDetails>,
) -> BoardResult<(StatusCode, Json<InterviewInvitation>)> {
    let interview = ctx
        .interviews
        .schedule(&auth.user, application_id, details)
        .await?;
    Ok((StatusCode::CREATED, Json(interview)))
}

async fn list_interviews(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(application_id): Path<ApplicationId>,
) -> BoardResult<Json<Vec<InterviewInvitation>>> {
    let interviews = ctx
        .interviews
        .list_for_application(&auth.user, application_id)
        .await?;
    Ok(Json(interviews))
}

async fn get_interview(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<InterviewId>,
) -> BoardResult<Json<InterviewInvitation>> {
    Ok(Json(ctx.interviews.get(&auth.user, id).await?))
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CancelRequest {
    reason: Option<String>,
}

async fn cancel(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<InterviewId>,
    req: OptionalJson<CancelRequest>,
) -> BoardResult<Json<InterviewInvitation>> {
    let req = req.or_default();
    let interview = ctx.interviews.cancel(&auth.user, id, req.reason).await?;
    Ok(Json(interview))
}

async fn reschedule(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<InterviewId>,
    Json(req): Json<RescheduleRequest>,
) -> BoardResult<Json<InterviewInvitation>> {
    let interview = ctx.interviews.reschedule(&auth.user, id, req).await?;
    Ok(Json(interview))
}

/// `{"response": "accept" | "decline"}`
#[derive(Deserialize)]
struct RespondRequest {
    response: InterviewResponse,
}

async fn respond(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<InterviewId>,
    Json(req): Json<RespondRequest>,
) -> BoardResult<Json<InterviewInvitation>> {
    let interview = ctx.interviews.respond(&auth.user, id, req.response).await?;
    Ok(Json(interview))
}
