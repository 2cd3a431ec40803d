use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::Json,
    payload::CommentPayload,
    routes::posts::fetch_existing_post,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use yatube_common::{
    model::{
        Id,
        comment::{Comment, CommentMarker, CreateComment},
        post::PostMarker,
        text::Text,
    },
    permission::Authored,
};
use yatube_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_get(get_comment)
        .typed_put(replace_comment)
        .typed_patch(update_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments", rejection(ServerError))]
struct CommentsPath {
    post_id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments/{comment_id}", rejection(ServerError))]
struct CommentPath {
    post_id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

/// Looks the comment up under its post, reporting a missing post before a missing comment.
async fn fetch_existing_comment(
    db: &DbClient,
    post_id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
) -> Result<Comment> {
    fetch_existing_post(db, post_id).await?;

    db.fetch_comment(post_id, comment_id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(post_id, comment_id))
}

async fn list_comments(
    CommentsPath { post_id }: CommentsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Comment>>> {
    fetch_existing_post(&db, post_id).await?;
    let comments = db.fetch_comments(post_id).await?;

    Ok(Json(comments))
}

async fn create_comment(
    CommentsPath { post_id }: CommentsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(payload): Json<CommentPayload>,
) -> Result<(StatusCode, Json<Comment>)> {
    fetch_existing_post(&db, post_id).await?;

    let comment = CreateComment {
        post: post_id,
        author: user.user_id(),
        text: payload.into_text()?,
    };
    let comment_id = db.create_comment(&comment).await?;
    let comment = fetch_existing_comment(&db, post_id, comment_id).await?;

    info!(post = %post_id, comment = %comment_id, "New comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_comment(
    CommentPath {
        post_id,
        comment_id,
    }: CommentPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Comment>> {
    let comment = fetch_existing_comment(&db, post_id, comment_id).await?;

    Ok(Json(comment))
}

async fn replace_comment(
    CommentPath {
        post_id,
        comment_id,
    }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(payload): Json<CommentPayload>,
) -> Result<Json<Comment>> {
    let comment = fetch_existing_comment(&db, post_id, comment_id).await?;
    comment.ensure_author(user.user_id())?;

    apply_update(&db, comment, Some(payload.into_text()?)).await
}

async fn update_comment(
    CommentPath {
        post_id,
        comment_id,
    }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(payload): Json<CommentPayload>,
) -> Result<Json<Comment>> {
    let comment = fetch_existing_comment(&db, post_id, comment_id).await?;
    comment.ensure_author(user.user_id())?;

    apply_update(&db, comment, payload.into_partial_text()?).await
}

async fn apply_update(
    db: &DbClient,
    comment: Comment,
    text: Option<Text>,
) -> Result<Json<Comment>> {
    let Some(text) = text else {
        return Ok(Json(comment));
    };

    db.update_comment(comment.id, &text).await?;

    Ok(Json(
        fetch_existing_comment(db, comment.post, comment.id).await?,
    ))
}

async fn delete_comment(
    CommentPath {
        post_id,
        comment_id,
    }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let comment = fetch_existing_comment(&db, post_id, comment_id).await?;
    comment.ensure_author(user.user_id())?;

    db.delete_comment(comment_id).await?;

    info!(post = %post_id, comment = %comment_id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
