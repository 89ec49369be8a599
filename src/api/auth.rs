/// Registration and login
use crate::{
    account::{NewAccount, Session, User},
    context::AppContext,
    error::BoardResult,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

async fn register(
    State(ctx): State<AppContext>,
    Json(input): Json<NewAccount>,
) -> BoardResult<(StatusCode, Json<User>)> {
    let user = ctx.accounts.create_account(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> BoardResult<Json<Session>> {
    let session = ctx.accounts.login(&req.email, &req.password).await?;
    Ok(Json(session))
}
