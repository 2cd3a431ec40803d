use crate::server::{Result, ServerError, ServerRouter, extract::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use yatube_common::model::{
    Id,
    group::{Group, GroupMarker},
};
use yatube_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_groups)
        .typed_get(get_group)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/groups", rejection(ServerError))]
struct GroupsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/groups/{group_id}", rejection(ServerError))]
struct GroupPath {
    group_id: Id<GroupMarker>,
}

async fn list_groups(
    GroupsPath(): GroupsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Group>>> {
    let groups = db.fetch_groups().await?;

    Ok(Json(groups))
}

async fn get_group(
    GroupPath { group_id }: GroupPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Group>> {
    let group = db
        .fetch_group(group_id)
        .await?
        .ok_or(ServerError::GroupByIdNotFound(group_id))?;

    Ok(Json(group))
}
