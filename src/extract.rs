use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// ApiJson
///
/// `axum::Json` whose rejection renders as an `ApiError`, so a malformed or incomplete
/// body gets the same `{"notes": [...]}` envelope as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// ApiPath
///
/// `axum::extract::Path` with an `ApiError` rejection. `/notes/abc` is a 400 in the
/// usual envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
