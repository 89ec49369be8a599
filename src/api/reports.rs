/// User-submitted reports
use crate::{
    admin::reports::{NewReport, Report},
    auth::AuthContext,
    context::AppContext,
    error::BoardResult,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/reports", post(submit_report))
}

async fn submit_report(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(input): Json<NewReport>,
) -> BoardResult<(StatusCode, Json<Report>)> {
    let report = ctx.reports.submit(&auth.user, input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}
