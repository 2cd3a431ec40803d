use crate::server::{
    Result, ServerError, ServerRouter, Settings,
    extract::Json,
    payload::{FieldError, UserPayload},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;
use yatube_common::model::{
    Id,
    auth::{AuthToken, Authentication},
    user::{CreateUser, User, UserMarker},
};
use yatube_db::client::{DbClient, DbError};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_user)
        .typed_get(get_user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{user_id}", rejection(ServerError))]
struct UserPath {
    user_id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct Registration {
    user: User,
    /// The only time the token is ever shown.
    token: String,
}

async fn create_user(
    UsersPath(): UsersPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<Settings>,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<Registration>)> {
    let username = payload.into_username()?;

    let mut transaction = db.begin().await?;
    let user = transaction
        .create_user(&CreateUser { username })
        .await
        .map_err(|err| match err {
            DbError::UniqueViolation(_) => FieldError::username_taken().into(),
            err => ServerError::from(err),
        })?;

    let token = AuthToken::generate_random(user.id);
    transaction
        .create_auth(&Authentication {
            user: user.id,
            token_hash: token.hash()?,
            created_at: OffsetDateTime::now_utc(),
            expires_after: settings.token_lifetime,
        })
        .await?;
    transaction.commit().await?;

    info!(user = %user.id, username = user.username.get(), "New user registered");
    Ok((
        StatusCode::CREATED,
        Json(Registration {
            user,
            token: token.to_string(),
        }),
    ))
}

async fn get_user(
    UserPath { user_id }: UserPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(user_id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(user_id))?;

    Ok(Json(user))
}
