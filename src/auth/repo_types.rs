use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::roles::Role;
use super::services::is_valid_email;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub role: Role,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>, // sha256 of the mailed token
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    /// True when the password changed after a token issued at `iat` (unix seconds).
    pub fn changed_password_after(&self, iat: i64) -> bool {
        match self.password_changed_at {
            Some(changed) => changed.unix_timestamp() > iat,
            None => false,
        }
    }

    pub fn set_password_reset(&mut self, token_hash: String, expires: OffsetDateTime) {
        self.password_reset_token = Some(token_hash);
        self.password_reset_expires = Some(expires);
    }

    pub fn clear_password_reset(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }

    /// Document-level checks run by a validating save.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Please tell us your name".into());
        }
        if !is_valid_email(&self.email) {
            return Err("Please provide a valid email".into());
        }
        if self.password_hash.is_empty() {
            return Err("Please provide a password".into());
        }
        if self.password_reset_token.is_some() != self.password_reset_expires.is_some() {
            return Err("reset token and expiry must be set together".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Jonas".into(),
            email: "jonas@example.com".into(),
            password_hash: "$argon2id$stub".into(),
            role: Role::User,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn never_changed_is_never_stale() {
        assert!(!sample_user().changed_password_after(0));
    }

    #[test]
    fn change_after_issue_is_stale() {
        let now = OffsetDateTime::now_utc();
        let mut user = sample_user();
        user.password_changed_at = Some(now);
        let issued = (now - Duration::seconds(30)).unix_timestamp();
        assert!(user.changed_password_after(issued));
        assert!(!user.changed_password_after(now.unix_timestamp()));
        assert!(!user.changed_password_after(now.unix_timestamp() + 5));
    }

    #[test]
    fn validate_catches_missing_fields() {
        let mut user = sample_user();
        assert!(user.validate().is_ok());

        user.name = "  ".into();
        assert!(user.validate().is_err());

        let mut user = sample_user();
        user.email = "not-an-email".into();
        assert!(user.validate().is_err());

        let mut user = sample_user();
        user.password_reset_token = Some("abc".into());
        assert!(user.validate().is_err());
    }

    #[test]
    fn serialization_hides_secrets() {
        let mut user = sample_user();
        user.set_password_reset("deadbeef".into(), OffsetDateTime::now_utc());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("passwordResetToken").is_none());
        assert!(json.get("passwordResetExpires").is_none());
        assert_eq!(json["email"], "jonas@example.com");
        assert_eq!(json["role"], "user");

        user.clear_password_reset();
        assert!(user.password_reset_token.is_none());
        assert!(user.password_reset_expires.is_none());
    }
}
