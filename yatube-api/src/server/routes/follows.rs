use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Json, Query},
    payload::{FieldError, FollowPayload},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use yatube_common::model::follow::{Follow, InvalidFollowError, check_not_self, search_terms};
use yatube_db::client::{DbClient, DbError};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_follows)
        .typed_post(create_follow)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follow", rejection(ServerError))]
struct FollowPath();

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct FollowSearch {
    search: Option<String>,
}

async fn list_follows(
    FollowPath(): FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Query(FollowSearch { search }): Query<FollowSearch>,
) -> Result<Json<Vec<Follow>>> {
    let terms = search.as_deref().map(search_terms).unwrap_or_default();
    let follows = db.fetch_follows(user.user_id(), &terms).await?;

    Ok(Json(follows))
}

async fn create_follow(
    FollowPath(): FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(payload): Json<FollowPayload>,
) -> Result<(StatusCode, Json<Follow>)> {
    let username = payload.into_username()?;
    let following = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or_else(|| FieldError::unknown_username(username.get()))?;

    check_not_self(user.user_id(), following.id).map_err(FieldError::from)?;
    if db.follow_exists(user.user_id(), following.id).await? {
        return Err(FieldError::from(InvalidFollowError::AlreadyFollowing).into());
    }

    db.create_follow(user.user_id(), following.id)
        .await
        .map_err(|err| match err {
            DbError::UniqueViolation(_) => {
                FieldError::from(InvalidFollowError::AlreadyFollowing).into()
            }
            err => ServerError::from(err),
        })?;

    let follower = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    info!(
        user = follower.username.get(),
        following = following.username.get(),
        "New follow"
    );
    Ok((
        StatusCode::CREATED,
        Json(Follow {
            user: follower.username,
            following: following.username,
        }),
    ))
}
