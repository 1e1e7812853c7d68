use crate::config::AppConfig;
use crate::db;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.database_url).await?;
        db::migrate(&db).await?;
        Ok(Self { db, config })
    }

    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::{JwtConfig, SessionConfig};

        let db = db::memory().await;
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: Some(5),
            },
            session: SessionConfig {
                secret: "test-session".into(),
                cookie_name: "test_session".into(),
                secure: false,
            },
        });
        Self { db, config }
    }
}
