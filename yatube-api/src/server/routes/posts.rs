use crate::server::{
    Result, ServerError, ServerRouter, Settings,
    auth::AuthenticatedUser,
    extract::{Json, Query},
    payload::{FieldError, PostPayload},
};
use axum::{
    extract::State,
    http::{StatusCode, Uri, header},
    response::IntoResponse,
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use yatube_common::{
    model::{
        Id,
        group::GroupMarker,
        post::{Post, PostFilter, PostMarker, UpdatePost},
    },
    pagination::{LimitOffset, Listing},
    permission::Authored,
};
use yatube_db::client::{DbClient, DbError};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(replace_post)
        .typed_patch(update_post)
        .typed_delete(delete_post)
        .typed_get(get_post_image)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}", rejection(ServerError))]
struct PostPath {
    post_id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/image", rejection(ServerError))]
struct PostImagePath {
    post_id: Id<PostMarker>,
}

pub(super) async fn fetch_existing_post(db: &DbClient, id: Id<PostMarker>) -> Result<Post> {
    db.fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))
}

async fn check_group_exists(db: &DbClient, group: Option<Id<GroupMarker>>) -> Result<()> {
    if let Some(group) = group
        && db.fetch_group(group).await?.is_none()
    {
        return Err(FieldError::unknown_group(group).into());
    }

    Ok(())
}

/// The group can still disappear between the existence check and the write.
fn map_group_violation(err: DbError, group: Option<Id<GroupMarker>>) -> ServerError {
    match (err, group) {
        (DbError::ForeignKeyViolation(_), Some(group)) => FieldError::unknown_group(group).into(),
        (err, _) => err.into(),
    }
}

async fn list_posts(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Settings>,
    Query(filter): Query<PostFilter>,
    uri: Uri,
) -> Result<Json<Listing<Post>>> {
    let Some(window) = LimitOffset::from_query(uri.query(), settings.default_page_size) else {
        let posts = db.fetch_posts(&filter, None).await?;
        return Ok(Json(Listing::All(posts)));
    };

    let count = db.count_posts(&filter).await?;
    let posts = db.fetch_posts(&filter, Some(window)).await?;

    Ok(Json(Listing::Page(window.into_page(
        uri.path(),
        uri.query(),
        count,
        posts,
    ))))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(payload): Json<PostPayload>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = payload.into_create(user.user_id())?;
    check_group_exists(&db, post.group).await?;

    let id = db
        .create_post(&post)
        .await
        .map_err(|err| map_group_violation(err, post.group))?;
    let post = fetch_existing_post(&db, id).await?;

    info!(post = %id, author = post.author.get(), "New post created");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    PostPath { post_id: id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = fetch_existing_post(&db, id).await?;

    Ok(Json(post))
}

async fn replace_post(
    PostPath { post_id: id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(payload): Json<PostPayload>,
) -> Result<Json<Post>> {
    let post = fetch_existing_post(&db, id).await?;
    post.ensure_author(user.user_id())?;

    apply_update(&db, id, payload.into_update(false)?).await
}

async fn update_post(
    PostPath { post_id: id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(payload): Json<PostPayload>,
) -> Result<Json<Post>> {
    let post = fetch_existing_post(&db, id).await?;
    post.ensure_author(user.user_id())?;

    apply_update(&db, id, payload.into_update(true)?).await
}

async fn apply_update(
    db: &DbClient,
    id: Id<PostMarker>,
    update: UpdatePost,
) -> Result<Json<Post>> {
    let group = update.group.flatten();
    check_group_exists(db, group).await?;

    db.update_post(id, &update)
        .await
        .map_err(|err| map_group_violation(err, group))?;

    Ok(Json(fetch_existing_post(db, id).await?))
}

async fn delete_post(
    PostPath { post_id: id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    let post = fetch_existing_post(&db, id).await?;
    post.ensure_author(user.user_id())?;

    db.delete_post(id).await?;

    info!(post = %id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_post_image(
    PostImagePath { post_id: id }: PostImagePath,
    State(db): State<Arc<DbClient>>,
) -> Result<impl IntoResponse> {
    let image = db
        .fetch_post_image(id)
        .await?
        .ok_or(ServerError::PostImageNotFound(id))?;

    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes))
}
