use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::{
    dto::{LoginRequest, SignupRequest},
    password::{hash_password_blocking, verify_password_blocking},
    repo::SaveOptions,
    repo_types::{NewUser, User},
    reset::{hash_token, ResetToken},
    roles::Role,
};
use crate::{error::AppError, mailer::Email, state::AppState};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::Validation(
            "Password must have at least 8 characters".into(),
        ));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords are not the same".into()));
    }
    Ok(())
}

/// Creates the account and returns a token for it.
pub async fn signup(st: &AppState, req: SignupRequest) -> Result<(String, User), AppError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();

    if name.is_empty() {
        return Err(AppError::Validation("Please tell us your name".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Please provide a valid email".into()));
    }
    check_new_password(&req.password, &req.password_confirm)?;

    // elevated roles are granted out of band, never self-assigned
    let role = req.role.unwrap_or_default();
    if role != Role::User {
        warn!(email = %email, role = ?role, "signup asked for elevated role");
        return Err(AppError::Forbidden);
    }

    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered"));
    }

    let password_hash = hash_password_blocking(req.password).await?;
    let user = st
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await?;

    let token = st.keys.issue(user.id)?;
    info!(user_id = %user.id, email = %user.email, role = ?user.role, "user signed up");
    Ok((token, user))
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<String, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Please provide email and password".into(),
        ));
    }

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthenticated("Incorrect email or password"));
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthenticated("Incorrect email or password"));
    }

    let token = st.keys.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

/// Stores a fresh reset token hash and mails the plain token to the user.
pub async fn request_password_reset(st: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    let mut user = st
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("There is no user with that email address"))?;

    let cfg = &st.config.reset;
    let token = ResetToken::generate();
    user.set_password_reset(token.hash, OffsetDateTime::now_utc() + cfg.ttl);
    st.users.save(&user, SaveOptions::SKIP_VALIDATION).await?;

    let reset_url = format!(
        "{}/api/v1/users/resetPassword/{}",
        cfg.public_base_url, token.plain
    );
    let message = Email {
        to: user.email.clone(),
        subject: format!(
            "Your password reset token (valid for {} min)",
            cfg.ttl.as_secs() / 60
        ),
        body: format!(
            "Forgot your password? Submit a PATCH request with your new password and \
             passwordConfirm to: {reset_url}\nIf you didn't forget your password, please \
             ignore this email."
        ),
    };

    if let Err(e) = st.mailer.send(message).await {
        error!(error = %e, user_id = %user.id, "reset email delivery failed");
        user.clear_password_reset();
        if let Err(e) = st.users.save(&user, SaveOptions::SKIP_VALIDATION).await {
            error!(error = %e, user_id = %user.id, "clearing reset token failed");
        }
        return Err(AppError::EmailDeliveryFailed);
    }

    info!(user_id = %user.id, "password reset token sent");
    Ok(())
}

/// Redeems a reset token, sets the new password and returns a fresh login token.
pub async fn complete_password_reset(
    st: &AppState,
    token: &str,
    password: String,
    password_confirm: &str,
) -> Result<String, AppError> {
    let token_hash = hash_token(token);
    let now = OffsetDateTime::now_utc();
    if st.users.find_by_reset_token(&token_hash, now).await?.is_none() {
        warn!("reset token unknown or expired");
        return Err(AppError::InvalidOrExpiredToken);
    }

    check_new_password(&password, password_confirm)?;
    let password_hash = hash_password_blocking(password).await?;

    // the lookup above can race another redemption; only the conditional write decides
    let user = st
        .users
        .redeem_reset_token(&token_hash, OffsetDateTime::now_utc(), &password_hash)
        .await?
        .ok_or_else(|| {
            warn!("reset token consumed or expired during redemption");
            AppError::InvalidOrExpiredToken
        })?;

    let token = st.keys.issue(user.id)?;
    info!(user_id = %user.id, "password reset completed");
    Ok(token)
}
