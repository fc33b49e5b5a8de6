use anyhow::Context;

/// Longest accepted access-token lifetime: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

const DEFAULT_TTL_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    /// Access-token lifetime; errors instead of overflowing on out-of-range values.
    pub fn access_ttl(&self) -> anyhow::Result<time::Duration> {
        if !(1..=MAX_TTL_MINUTES).contains(&self.ttl_minutes) {
            anyhow::bail!(
                "access token ttl must be between 1 and {MAX_TTL_MINUTES} minutes, got {}",
                self.ttl_minutes
            );
        }
        let secs = self
            .ttl_minutes
            .checked_mul(60)
            .context("access token ttl overflows")?;
        Ok(time::Duration::seconds(secs))
    }
}

fn parse_ttl_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    match raw {
        Some(v) => v
            .trim()
            .parse::<i64>()
            .context("ACCESS_TOKEN_TTL_MINUTES must be a whole number of minutes"),
        None => Ok(DEFAULT_TTL_MINUTES),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>().context("APP_PORT must be a port number")?,
            Err(_) => 8080,
        };
        let ttl_raw = std::env::var("ACCESS_TOKEN_TTL_MINUTES").ok();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "fling".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "fling-users".into()),
            ttl_minutes: parse_ttl_minutes(ttl_raw.as_deref())?,
        };
        jwt.access_ttl().context("ACCESS_TOKEN_TTL_MINUTES")?;
        Ok(Self {
            database_url,
            host,
            port,
            jwt,
        })
    }
}
