//! Request extractors whose rejections render as the usual
//! `{success: false, message}` body with a 400 status.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ClinicError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ClinicError))]
pub struct Json<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ClinicError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ClinicError))]
pub struct Query<T>(pub T);
