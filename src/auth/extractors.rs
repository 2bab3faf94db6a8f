use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{jwt::JwtKeys, repo::UserStore, repo_types::User, roles::Role};
use crate::{error::AppError, state::AppState};

/// Identity of a request that passed the authorization gate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}

/// Pulls `<token>` out of an `Authorization: Bearer <token>` value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.ok_or(AppError::Unauthenticated(
        "You are not logged in. Please log in to get access",
    ))?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AppError::Unauthenticated("Invalid Authorization header"))?;
    if token.is_empty() {
        return Err(AppError::Unauthenticated(
            "You are not logged in. Please log in to get access",
        ));
    }
    Ok(token)
}

/// Runs the gate: extract, verify, load the user, then reject stale sessions.
pub async fn authenticate(
    keys: &JwtKeys,
    users: &dyn UserStore,
    authorization: Option<&str>,
) -> Result<CurrentUser, AppError> {
    let token = bearer_token(authorization)?;

    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        AppError::Unauthenticated("Invalid or expired token. Please log in again")
    })?;

    let user = users.find_by_id(claims.sub).await?.ok_or_else(|| {
        warn!(user_id = %claims.sub, "token for deleted user");
        AppError::Unauthenticated("The user belonging to this token no longer exists")
    })?;

    if user.changed_password_after(claims.iat) {
        warn!(user_id = %user.id, "token issued before password change");
        return Err(AppError::Unauthenticated(
            "Password was changed recently. Please log in again",
        ));
    }

    debug!(user_id = %user.id, "request authenticated");
    Ok(CurrentUser(user))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        authenticate(&state.keys, state.users.as_ref(), header).await
    }
}
