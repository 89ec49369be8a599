/// The caller's own profile and file uploads
use crate::{
    account::{ProfilePatch, User},
    auth::AuthContext,
    context::AppContext,
    error::{BoardError, BoardResult},
    uploads::{IncomingFile, StoredUpload, UploadKind},
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

/// Multipart framing on top of the largest accepted file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes(upload_limit: usize) -> Router<AppContext> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route(
            "/api/me/resume",
            post(upload_resume).layer(DefaultBodyLimit::max(upload_limit + MULTIPART_OVERHEAD)),
        )
        .route(
            "/api/me/photo",
            post(upload_photo).layer(DefaultBodyLimit::max(upload_limit + MULTIPART_OVERHEAD)),
        )
}

async fn get_me(auth: AuthContext) -> Json<User> {
    Json(auth.user)
}

async fn update_me(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(patch): Json<ProfilePatch>,
) -> BoardResult<Json<User>> {
    let user = ctx.accounts.update_profile(auth.user_id(), patch).await?;
    Ok(Json(user))
}

#[derive(Serialize)]
struct UploadResponse {
    #[serde(flatten)]
    upload: StoredUpload,
    user: User,
}

async fn upload_resume(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> BoardResult<Json<UploadResponse>> {
    upload(ctx, auth, UploadKind::Resume, multipart).await
}

async fn upload_photo(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> BoardResult<Json<UploadResponse>> {
    upload(ctx, auth, UploadKind::Photo, multipart).await
}

async fn upload(
    ctx: AppContext,
    auth: AuthContext,
    kind: UploadKind,
    multipart: Multipart,
) -> BoardResult<Json<UploadResponse>> {
    let file = read_file_field(multipart).await?;
    let (upload, user) = ctx.uploads.store(&auth.user, kind, file).await?;
    Ok(Json(UploadResponse { upload, user }))
}

/// Pull the `file` field out of the form, ignoring any others
async fn read_file_field(mut multipart: Multipart) -> BoardResult<IncomingFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BoardError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| BoardError::Validation(format!("Failed to read upload: {}", e)))?;

        return Ok(IncomingFile {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(BoardError::invalid_field("file", "is required"))
}
