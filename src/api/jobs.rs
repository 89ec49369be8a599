/// Job listing endpoints
use crate::{
    account::UserRole,
    auth::{require_role, AuthContext},
    board::jobs::{Job, JobDraft, JobListFilter, JobSearch, JobStatus},
    context::AppContext,
    error::BoardResult,
    ids::JobId,
    pagination::{Page, PageParams},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/jobs", get(search_jobs).post(create_job))
        .route(
            "/api/jobs/:id",
            get(get_job).put(update_job).delete(delete_job),
        )
        .route("/api/jobs/:id/status", post(set_status))
        .route("/api/employer/jobs", get(list_own_jobs))
}

/// Public search; `?q=&location=&job_type=&remote=&min_salary=&sort=`
async fn search_jobs(
    State(ctx): State<AppContext>,
    Query(page): Query<PageParams>,
    Query(search): Query<JobSearch>,
) -> BoardResult<Json<Page<Job>>> {
    let jobs = ctx.jobs.search(&search, page).await?;
    Ok(Json(jobs))
}

/// Owners and staff also see listings that are not public yet
async fn get_job(
    State(ctx): State<AppContext>,
    auth: Option<AuthContext>,
    Path(id): Path<JobId>,
) -> BoardResult<Json<Job>> {
    let job = ctx
        .jobs
        .get_job_for(auth.as_ref().map(|a| &a.user), id)
        .await?;
    Ok(Json(job))
}

async fn create_job(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(draft): Json<JobDraft>,
) -> BoardResult<(StatusCode, Json<Job>)> {
    let job = ctx.jobs.create_job(&auth.user, draft).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn update_job(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<JobId>,
    Json(draft): Json<JobDraft>,
) -> BoardResult<Json<Job>> {
    let job = ctx.jobs.update_job(&auth.user, id, draft).await?;
    Ok(Json(job))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: JobStatus,
}

async fn set_status(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<JobId>,
    Json(req): Json<StatusRequest>,
) -> BoardResult<Json<Job>> {
    let job = ctx.jobs.set_status(&auth.user, id, req.status).await?;
    Ok(Json(job))
}

async fn delete_job(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<JobId>,
) -> BoardResult<StatusCode> {
    ctx.jobs.delete_job(&auth.user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_own_jobs(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(page): Query<PageParams>,
    Query(filter): Query<JobListFilter>,
) -> BoardResult<Json<Page<Job>>> {
    require_role(&auth, UserRole::Employer)?;
    let jobs = ctx.jobs.list_own_jobs(&auth.user, &filter, page).await?;
    Ok(Json(jobs))
}
