/// Application endpoints for applicants and employers
use crate::{
    account::UserRole,
    api::middleware::OptionalJson,
    auth::{require_role, AuthContext},
    board::applications::{ApplicationDraft, ApplicationFilter, JobApplication, StatusUpdate},
    context::AppContext,
    error::BoardResult,
    ids::{ApplicationId, JobId},
    pagination::{Page, PageParams},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/jobs/:id/apply", post(apply))
        .route("/api/applications", get(list_mine))
        .route(
            "/api/applications/:id",
            get(get_application).delete(withdraw),
        )
        .route("/api/applications/:id/status", post(update_status))
        .route("/api/employer/jobs/:id/applications", get(list_for_job))
}

/// The body is optional; without a resume the profile resume is attached
async fn apply(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(job_id): Path<JobId>,
    draft: OptionalJson<ApplicationDraft>,
) -> BoardResult<(StatusCode, Json<JobApplication>)> {
    let draft = draft.or_default();
    let application = ctx.applications.apply(&auth.user, job_id, draft).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn list_mine(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(page): Query<PageParams>,
    Query(filter): Query<ApplicationFilter>,
) -> BoardResult<Json<Page<JobApplication>>> {
    let applications = ctx
        .applications
        .list_for_applicant(&auth.user, filter, page)
        .await?;
    Ok(Json(applications))
}

async fn get_application(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<ApplicationId>,
) -> BoardResult<Json<JobApplication>> {
    let application = ctx.applications.get(&auth.user, id).await?;
    Ok(Json(application))
}

async fn withdraw(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<ApplicationId>,
) -> BoardResult<StatusCode> {
    ctx.applications.withdraw(&auth.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_status(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<ApplicationId>,
    Json(update): Json<StatusUpdate>,
) -> BoardResult<Json<JobApplication>> {
    let application = ctx
        .applications
        .update_status(&auth.user, id, update)
        .await?;
    Ok(Json(application))
}

async fn list_for_job(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(job_id): Path<JobId>,
    Query(page): Query<PageParams>,
    Query(filter): Query<ApplicationFilter>,
) -> BoardResult<Json<Page<JobApplication>>> {
    require_role(&auth, UserRole::Employer)?;
    let applications = ctx
        .applications
        .list_for_job(&auth.user, job_id, filter, page)
        .await?;
    Ok(Json(applications))
}
