use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::error::StoreError;

/// Whether `save` runs `User::validate` first.
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    pub validate: bool,
}

impl SaveOptions {
    pub const VALIDATE: Self = Self { validate: true };
    pub const SKIP_VALIDATION: Self = Self { validate: false };
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn save(&self, user: &User, opts: SaveOptions) -> Result<(), StoreError>;
    /// User whose stored reset hash matches and whose expiry is after `now`.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError>;
    /// Swaps in `password_hash` and clears the reset fields, but only while the
    /// stored hash still matches and has not expired. At most one caller wins.
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError>;
}

fn check(user: &User, opts: SaveOptions) -> Result<(), StoreError> {
    if opts.validate {
        user.validate().map_err(StoreError::Invalid)?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token, password_reset_expires, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token, password_reset_expires, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token, password_reset_expires, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn save(&self, user: &User, opts: SaveOptions) -> Result<(), StoreError> {
        check(user, opts)?;
        let res = sqlx::query(
            r#"
            UPDATE users
               SET name = $2,
                   email = $3,
                   password_hash = $4,
                   role = $5,
                   password_changed_at = $6,
                   password_reset_token = $7,
                   password_reset_expires = $8
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.password_changed_at)
        .bind(&user.password_reset_token)
        .bind(user.password_reset_expires)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::Backend(anyhow::anyhow!("user {} not found", user.id)));
        }
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, password_changed_at,
                   password_reset_token, password_reset_expires, created_at
            FROM users
            WHERE password_reset_token = $1
              AND password_reset_expires > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET password_hash = $3,
                   password_changed_at = $2,
                   password_reset_token = NULL,
                   password_reset_expires = NULL
             WHERE password_reset_token = $1
               AND password_reset_expires > $2
            RETURNING id, name, email, password_hash, role, password_changed_at,
                      password_reset_token, password_reset_expires, created_at
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
