use axum::{extract::{FromRequestParts, Query}, http::request::Parts};
use serde::Deserialize;

use crate::{sanitize, AppError};

pub const USER_HEADER: &str = "user";

/// Display name the caller claims to be, from the `user` header or, failing that, a `user`
/// query parameter. Nothing verifies the claim.
#[derive(Debug, Clone)]
pub struct User(pub String);

#[derive(Deserialize)]
struct UserQuery {
    user: Option<String>,
}

impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = match parts.headers.get(USER_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| AppError::validation("user header is not valid text"))?
                    .to_owned(),
            ),
            None => None,
        };

        let raw = match from_header {
            Some(raw) => Some(raw),
            None => Query::<UserQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(query)| query.user),
        };

        let user = raw.map(|raw| sanitize::clean(&raw)).unwrap_or_default();
        if user.is_empty() {
            return Err(AppError::validation("user is required"));
        }

        Ok(User(user))
    }
}
