//! `Json` and `Query` that reject with [`ServerError`] instead of axum's plain-text rejections,
//! so a malformed body or filter gets the same `{status, detail}` body as every other error.

use crate::server::ServerError;
use axum::{
    Json as AxumJson,
    extract::{FromRequest, FromRequestParts, Query as AxumQuery},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::Serialize;

/// Request and response bodies. A body over [`MAX_BODY_SIZE`](super::MAX_BODY_SIZE) answers 413,
/// any other unreadable body 400.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

/// List filters such as `?group=3` or `?search=ali`. Unknown parameters, `limit` and `offset`
/// among them, are ignored here.
#[derive(FromRequestParts, Debug, Clone, Copy, Default)]
#[from_request(via(AxumQuery), rejection(ServerError))]
pub struct Query<T>(pub T);
