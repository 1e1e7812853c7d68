use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://users.db";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    /// `None` issues tokens without an `exp` claim.
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match var("APP_PORT") {
            Some(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a port number: {v}"))?,
            None => 8080,
        };

        let secret = var("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set")?;
        let ttl_minutes = match var("JWT_TTL_MINUTES") {
            Some(v) => {
                let minutes = v
                    .parse::<i64>()
                    .with_context(|| format!("JWT_TTL_MINUTES is not a number: {v}"))?;
                (minutes > 0).then_some(minutes)
            }
            None => Some(60),
        };
        let jwt = JwtConfig {
            secret: secret.clone(),
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "userbase".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "userbase-api".into()),
            ttl_minutes,
        };

        let session = SessionConfig {
            secret: var("SESSION_SECRET").filter(|s| !s.is_empty()).unwrap_or(secret),
            cookie_name: var("SESSION_COOKIE").unwrap_or_else(|| "userbase_session".into()),
            secure: var("SESSION_COOKIE_SECURE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            session,
        })
    }
}
