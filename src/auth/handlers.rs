use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
            ResetPasswordRequest, SignupRequest, UserData, UserResponse,
        },
        extractors::CurrentUser,
        services,
    },
    error::AppError,
    extract::{JsonBody, PathParam},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/login", post(login))
        .route("/users/forgotPassword", post(forgot_password))
        .route("/users/resetPassword/:token", patch(reset_password))
        .route("/users/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (token, user) = services::signup(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            status: "success",
            token,
            data: Some(UserData { user }),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let token = services::login(&state, payload).await?;
    Ok(Json(AuthResponse {
        status: "success",
        token,
        data: None,
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(MessageResponse {
        status: "success",
        message: "Token sent to email!",
    }))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    PathParam(token): PathParam<String>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let token = services::complete_password_reset(
        &state,
        &token,
        payload.password,
        &payload.password_confirm,
    )
    .await?;
    Ok(Json(AuthResponse {
        status: "success",
        token,
        data: None,
    }))
}

#[instrument(skip(user), fields(user_id = %user.id()))]
pub async fn get_me(user: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        status: "success",
        data: UserData { user: user.0 },
    })
}

#[cfg(test)]
mod me_tests {
    use super::*;
    use crate::auth::{repo_types::User, roles::Role};
    use time::OffsetDateTime;

    #[tokio::test]
    async fn me_response_hides_password() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Admin,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: OffsetDateTime::now_utc(),
        };

        let Json(response) = get_me(CurrentUser(user)).await;
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("\"role\":\"admin\""));
        assert!(!json.contains("argon2"));
    }
}
