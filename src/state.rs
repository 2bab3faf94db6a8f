use crate::auth::{
    jwt::JwtKeys,
    repo::{PgUserStore, UserStore},
};
use crate::config::AppConfig;
use crate::mailer::{LogMailer, Mailer};
use crate::tours::repo::{PgTourStore, TourStore};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub tours: Arc<dyn TourStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let users = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let tours = Arc::new(PgTourStore::new(db)) as Arc<dyn TourStore>;
        let mailer = Arc::new(LogMailer::new(config.mail.from.clone())) as Arc<dyn Mailer>;

        Ok(Self::from_parts(config, users, tours, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        tours: Arc<dyn TourStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        Self {
            config,
            keys,
            users,
            tours,
            mailer,
        }
    }
}

#[cfg(test)]
impl AppState {
    pub fn fake() -> Self {
        Self::fake_with_mailer(Arc::new(crate::mailer::fake::RecordingMailer::default()))
    }

    pub fn fake_with_mailer(mailer: Arc<dyn Mailer>) -> Self {
        use crate::auth::repo::memory::MemoryUserStore;
        use crate::tours::repo::memory::MemoryTourStore;

        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryTourStore::default()),
            mailer,
        )
    }
}
