use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::auth::session::SessionContext;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    RenderProtected,
    RenderLogin,
}

/// Decides whether a protected route may render for this context.
pub fn evaluate_route(ctx: &SessionContext) -> RouteDecision {
    if ctx.is_authenticated() {
        RouteDecision::RenderProtected
    } else {
        RouteDecision::RenderLogin
    }
}

/// Extracts the session token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Proof that the request carries a live session. Protected handlers take
/// this as their first argument so the check runs before any handler code.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub token: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = state.sessions.context(bearer_token(&parts.headers)).await?;
        match (evaluate_route(&ctx), ctx.token()) {
            (RouteDecision::RenderProtected, Some(token)) => Ok(Authenticated { token }),
            _ => Err(AppError::Unauthorized),
        }
    }
}
