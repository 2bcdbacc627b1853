//! Auth route handlers.
//!
//! Login and registration are owned by the external auth system; it writes
//! the session identity that [`crate::middleware::auth`] reads. This module
//! only exposes the session introspection endpoint the frontend uses to
//! decide between guest and account checkout.

use axum::Json;
use serde::Serialize;

use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CurrentUser>,
}

/// GET /auth/session - who this session belongs to, if anyone.
pub async fn session(OptionalAuth(user): OptionalAuth) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    })
}
