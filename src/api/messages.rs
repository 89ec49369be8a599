/// Direct messages, read by polling
use crate::{
    auth::AuthContext,
    board::messages::{ConversationSummary, Message, NewMessage},
    context::AppContext,
    error::BoardResult,
    ids::UserId,
    pagination::{Page, PageParams},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/messages", get(inbox))
        .route("/api/messages/unread", get(unread_count))
        .route("/api/messages/:user_id", get(conversation).post(send))
        .route("/api/messages/:user_id/read", post(mark_read))
}

async fn inbox(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> BoardResult<Json<Vec<ConversationSummary>>> {
    Ok(Json(ctx.messages.conversations(&auth.user).await?))
}

#[derive(Serialize)]
struct CountResponse {
    count: i64,
}

async fn unread_count(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> BoardResult<Json<CountResponse>> {
    let count = ctx.messages.unread_count(&auth.user).await?;
    Ok(Json(CountResponse { count }))
}

/// Reading a conversation marks the counterpart's messages read
async fn conversation(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(other): Path<UserId>,
    Query(page): Query<PageParams>,
) -> BoardResult<Json<Page<Message>>> {
    let messages = ctx.messages.conversation(&auth.user, other, page).await?;
    ctx.messages.mark_read(&auth.user, other).await?;
    Ok(Json(messages))
}

async fn send(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(receiver): Path<UserId>,
    Json(input): Json<NewMessage>,
) -> BoardResult<(StatusCode, Json<Message>)> {
    let message = ctx.messages.send(&auth.user, receiver, input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Serialize)]
struct MarkedResponse {
    marked: u64,
}

async fn mark_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(other): Path<UserId>,
) -> BoardResult<Json<MarkedResponse>> {
    let marked = ctx.messages.mark_read(&auth.user, other).await?;
    Ok(Json(MarkedResponse { marked }))
}
