use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::logic::ApiError;
use crate::model::Credentials;

/// Axum extractor for HTTP basic credentials
///
/// A request without an `Authorization` header yields `BasicAuth(None)`;
/// whether that is acceptable is up to the handler. A header that is
/// present but not valid basic auth is rejected with 401.
#[derive(Debug, Clone)]
pub struct BasicAuth(pub Option<Credentials>);

#[async_trait]
impl<S> FromRequestParts<S> for BasicAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(AUTHORIZATION) else {
            return Ok(BasicAuth(None));
        };
        match decode_basic(value) {
            Some(credentials) => Ok(BasicAuth(Some(credentials))),
            None => {
                log::warn!("malformed Authorization header");
                Err(ApiError::Unauthorized(
                    "Couldn't authenticate you".to_string(),
                ))
            }
        }
    }
}

/// Decode `Basic base64(login:password)`
fn decode_basic(value: &HeaderValue) -> Option<Credentials> {
    let (scheme, encoded) = value.to_str().ok()?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (login, password) = decoded.split_once(':')?;
    Some(Credentials::new(login, password))
}
