use crate::server::extract::Json;
use axum::{
    Router,
    extract::{
        DefaultBodyLimit, FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use payload::FieldError;
use serde::Serialize;
use std::{num::NonZeroU32, sync::Arc};
use thiserror::Error;
use tracing::error;
use yatube_common::{
    model::{
        Id,
        auth::{AuthTokenDecodeError, AuthTokenHashError},
        comment::CommentMarker,
        group::GroupMarker,
        post::PostMarker,
        user::UserMarker,
    },
    permission::NotAuthorError,
    util::PositiveDuration,
};
use yatube_db::client::{DbClient, DbError};

mod auth;
mod extract;
mod payload;
mod routes;
#[cfg(test)]
mod tests;

/// Base64 inflates an image by a third, so this leaves room for a full-size one.
pub const MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

pub type ServerRouter = Router<ServerState>;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Settings {
    pub default_page_size: NonZeroU32,
    pub token_lifetime: Option<PositiveDuration>,
}

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub settings: Settings,
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub async fn method_not_allowed(method: Method) -> ServerError {
    ServerError::MethodNotAllowed(method)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(Method),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error(transparent)]
    Forbidden(#[from] NotAuthorError),
    #[error(transparent)]
    Validation(#[from] FieldError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Post with id {0} has no image.")]
    PostImageNotFound(Id<PostMarker>),
    #[error("Comment with id {1} was not found under post {0}.")]
    CommentByIdNotFound(Id<PostMarker>, Id<CommentMarker>),
    #[error("Group with id {0} was not found.")]
    GroupByIdNotFound(Id<GroupMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::PostImageNotFound(_)
            | ServerError::CommentByIdNotFound(..)
            | ServerError::GroupByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::JsonRejection(rejection)
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
            {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client gets to see. Server-side failures stay in the logs.
    fn detail(&self) -> String {
        if self.status().is_server_error() {
            "Internal server error".to_owned()
        } else {
            self.to_string()
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            detail: self.detail(),
            field: match &self {
                ServerError::Validation(field_error) => field_error.field,
                _ => None,
            },
        };
        (status, Json(error_response)).into_response()
    }
}
