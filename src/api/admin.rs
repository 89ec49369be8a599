/// Moderation dashboard endpoints
///
/// Every route requires a moderator or admin (`StaffContext`); finer checks
/// such as who may act on whom live in the services.
use crate::{
    account::{User, UserFilter},
    api::middleware::OptionalJson,
    admin::{
        moderation::{BanRequest, ReasonRequest, SuspendRequest, UnbanRequest},
        reports::ReportFilter,
        AuditEntry, AuditFilter, DashboardStats, Report,
    },
    auth::StaffContext,
    board::jobs::{Job, JobListFilter, ModerationStatus},
    context::AppContext,
    error::BoardResult,
    ids::{EntityRef, JobId, ReportId, UserId},
    pagination::{Page, PageParams},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/stats", get(get_stats))
        // Job review
        .route("/api/admin/jobs", get(moderation_queue))
        .route("/api/admin/jobs/:id/approve", post(approve_job))
        .route("/api/admin/jobs/:id/reject", post(reject_job))
        .route("/api/admin/jobs/:id/override", post(override_job))
        .route("/api/admin/jobs/:id", delete(delete_job))
        // Users
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:id", get(get_user).delete(delete_user))
        .route("/api/admin/users/:id/ban", post(ban_user))
        .route("/api/admin/users/:id/suspend", post(suspend_user))
        .route("/api/admin/users/:id/warn", post(warn_user))
        .route("/api/admin/users/:id/unban", post(unban_user))
        // Reports
        .route("/api/admin/reports", get(list_reports))
        .route("/api/admin/reports/:id", get(get_report))
        .route("/api/admin/reports/:id/resolve", post(resolve_report))
        .route("/api/admin/reports/:id/dismiss", post(dismiss_report))
        .route("/api/admin/audit-log", get(audit_log))
}

async fn get_stats(
    State(ctx): State<AppContext>,
    _staff: StaffContext,
) -> BoardResult<Json<DashboardStats>> {
    Ok(Json(ctx.reports.stats().await?))
}

// ============================================================================
// Job review
// ============================================================================

/// Oldest first; `?moderation_status=pending` for the review queue
async fn moderation_queue(
    State(ctx): State<AppContext>,
    _staff: StaffContext,
    Query(page): Query<PageParams>,
    Query(filter): Query<JobListFilter>,
) -> BoardResult<Json<Page<Job>>> {
    Ok(Json(ctx.jobs.moderation_queue(&filter, page).await?))
}

async fn approve_job(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<JobId>,
) -> BoardResult<Json<Job>> {
    Ok(Json(ctx.jobs.approve(&staff.user, id).await?))
}

async fn reject_job(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<JobId>,
    Json(req): Json<ReasonRequest>,
) -> BoardResult<Json<Job>> {
    Ok(Json(ctx.jobs.reject(&staff.user, id, &req.reason).await?))
}

#[derive(Deserialize)]
struct OverrideRequest {
    moderation_status: ModerationStatus,
    reason: String,
}

async fn override_job(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<JobId>,
    Json(req): Json<OverrideRequest>,
) -> BoardResult<Json<Job>> {
    let job = ctx
        .jobs
        .override_moderation(&staff.user, id, req.moderation_status, &req.reason)
        .await?;
    Ok(Json(job))
}

async fn delete_job(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<JobId>,
    Json(req): Json<ReasonRequest>,
) -> BoardResult<StatusCode> {
    ctx.jobs.moderator_delete(&staff.user, id, &req.reason).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// User moderation
// ============================================================================

async fn list_users(
    State(ctx): State<AppContext>,
    _staff: StaffContext,
    Query(page): Query<PageParams>,
    Query(filter): Query<UserFilter>,
) -> BoardResult<Json<Page<User>>> {
    Ok(Json(ctx.accounts.list_users(&filter, page).await?))
}

#[derive(Serialize)]
struct UserDetail {
    user: User,
    history: Vec<AuditEntry>,
}

/// The account with every audit entry that targets it
async fn get_user(
    State(ctx): State<AppContext>,
    _staff: StaffContext,
    Path(id): Path<UserId>,
) -> BoardResult<Json<UserDetail>> {
    let user = ctx.accounts.get_user(id).await?;
    let history = ctx.audit.for_target(EntityRef::User(id)).await?;
    Ok(Json(UserDetail { user, history }))
}

async fn ban_user(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<UserId>,
    Json(req): Json<BanRequest>,
) -> BoardResult<Json<User>> {
    Ok(Json(ctx.moderation.ban(&staff.user, id, req).await?))
}

async fn suspend_user(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<UserId>,
    Json(req): Json<SuspendRequest>,
) -> BoardResult<Json<User>> {
    Ok(Json(ctx.moderation.suspend(&staff.user, id, req).await?))
}

async fn warn_user(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<UserId>,
    Json(req): Json<ReasonRequest>,
) -> BoardResult<Json<User>> {
    Ok(Json(ctx.moderation.warn(&staff.user, id, req).await?))
}

async fn unban_user(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<UserId>,
    req: OptionalJson<UnbanRequest>,
) -> BoardResult<Json<User>> {
    let req = req.or_default();
    Ok(Json(ctx.moderation.unban(&staff.user, id, req).await?))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<UserId>,
    Json(req): Json<ReasonRequest>,
) -> BoardResult<StatusCode> {
    ctx.moderation.delete_user(&staff.user, id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Reports and audit trail
// ============================================================================

async fn list_reports(
    State(ctx): State<AppContext>,
    _staff: StaffContext,
    Query(page): Query<PageParams>,
    Query(filter): Query<ReportFilter>,
) -> BoardResult<Json<Page<Report>>> {
    Ok(Json(ctx.reports.list(&filter, page).await?))
}

async fn get_report(
    State(ctx): State<AppContext>,
    _staff: StaffContext,
    Path(id): Path<ReportId>,
) -> BoardResult<Json<Report>> {
    Ok(Json(ctx.reports.get(id).await?))
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ReviewRequest {
    note: Option<String>,
}

async fn resolve_report(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<ReportId>,
    req: OptionalJson<ReviewRequest>,
) -> BoardResult<Json<Report>> {
    let req = req.or_default();
    Ok(Json(ctx.reports.resolve(&staff.user, id, req.note).await?))
}

async fn dismiss_report(
    State(ctx): State<AppContext>,
    staff: StaffContext,
    Path(id): Path<ReportId>,
    req: OptionalJson<ReviewRequest>,
) -> BoardResult<Json<Report>> {
    let req = req.or_default();
    Ok(Json(ctx.reports.dismiss(&staff.user, id, req.note).await?))
}

async fn audit_log(
    State(ctx): State<AppContext>,
    _staff: StaffContext,
    Query(page): Query<PageParams>,
    Query(filter): Query<AuditFilter>,
) -> BoardResult<Json<Page<AuditEntry>>> {
    Ok(Json(ctx.audit.list(&filter, page).await?))
}
