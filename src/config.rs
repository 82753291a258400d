use anyhow::Context;

/// Runtime configuration pulled from the environment.
///
/// Constructed once in `main` and passed down explicitly so modules can be
/// exercised in isolation.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub rate_limit_requests: usize,
    pub rate_limit_window_minutes: i64,
}

impl Config {
    /// Reads configuration from the environment.
    /// DATABASE_URL is the only required setting; everything else has a default.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env_or("PORT", 8080)?,
            allowed_origins: parse_origins(
                &std::env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_owned()),
            ),
            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", 5)?,
            rate_limit_window_minutes: env_or("RATE_LIMIT_WINDOW_MINUTES", 60)?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("{} cannot be parsed", key)),
        Err(_) => Ok(default),
    }
}

/// Splits a comma separated origin list, dropping blank entries.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}
