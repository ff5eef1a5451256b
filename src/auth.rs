//! Extracts the authenticated user from the request.
//!
//! Authentication itself happens upstream: a reverse proxy in front of the
//! application verifies the session and forwards the user's ID in a header.
//! Handlers take an [AuthenticatedUser] argument, so an unauthenticated
//! request is rejected before any handler code runs.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{Error, database_id::UserId};

/// The header the authenticating proxy sets.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The ID of the user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|text| text.parse::<UserId>().ok())
            .map(AuthenticatedUser)
            .ok_or(Error::NotAuthenticated)
    }
}
