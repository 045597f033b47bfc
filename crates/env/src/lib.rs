use std::{env::var, sync::Arc, time::Duration};

use dotenv::dotenv;
use eyre::{bail, eyre, Context, Error};
use log::info;
use model::decimal::Decimal;

/// Whole currency units; keeps `rate * days` far from the `i64` limit.
pub const MAX_RATE_PER_DAY: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Mongo,
    Memory,
}

#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

#[derive(Clone)]
pub struct EnvInner {
    storage: StorageKind,
    mongo_url: Option<String>,
    mongo_db: String,
    bind_addr: String,
    jwt_secret: String,
    admin_key: String,
    rate_per_day: Decimal,
    request_timeout: Duration,
    token_ttl: Duration,
}

impl Env {
    pub fn storage(&self) -> StorageKind {
        self.0.storage
    }

    /// Present whenever `storage()` is `Mongo`.
    pub fn mongo_url(&self) -> Option<&str> {
        self.0.mongo_url.as_deref()
    }

    pub fn mongo_db(&self) -> &str {
        &self.0.mongo_db
    }

    pub fn bind_addr(&self) -> &str {
        &self.0.bind_addr
    }

    pub fn jwt_secret(&self) -> &str {
        &self.0.jwt_secret
    }

    pub fn admin_key(&self) -> &str {
        &self.0.admin_key
    }

    pub fn rate_per_day(&self) -> Decimal {
        self.0.rate_per_day
    }

    pub fn request_timeout(&self) -> Duration {
        self.0.request_timeout
    }

    pub fn token_ttl(&self) -> Duration {
        self.0.token_ttl
    }

    pub fn load() -> Result<Env, Error> {
        if let Err(err) = dotenv() {
            info!("no .env file loaded: {}", err);
        }
        Env::from_lookup(|key| var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Env, Error> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage = match get("STORAGE").as_deref().map(str::trim) {
            None | Some("mongo") => StorageKind::Mongo,
            Some("memory") => StorageKind::Memory,
            Some(other) => bail!("STORAGE must be `mongo` or `memory`, got `{}`", other),
        };
        let mongo_url = get("MONGO_URL");
        if storage == StorageKind::Mongo && mongo_url.is_none() {
            bail!("MONGO_URL is not set");
        }

        let rate_per_day = match get("RATE_PER_DAY") {
            Some(rate) => rate
                .trim()
                .parse::<Decimal>()
                .context("RATE_PER_DAY is not a decimal")?,
            None => Decimal::int(80),
        };
        if rate_per_day.is_negative() {
            bail!("RATE_PER_DAY must not be negative");
        }
        if rate_per_day > Decimal::int(MAX_RATE_PER_DAY) {
            bail!("RATE_PER_DAY must not exceed {}", MAX_RATE_PER_DAY);
        }

        Ok(Env(Arc::new(EnvInner {
            storage,
            mongo_url,
            mongo_db: get("MONGO_DB").unwrap_or_else(|| "hostel_db".to_owned()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_owned()),
            jwt_secret: get("JWT_SECRET").ok_or_else(|| eyre!("JWT_SECRET is not set"))?,
            admin_key: get("ADMIN_KEY").ok_or_else(|| eyre!("ADMIN_KEY is not set"))?,
            rate_per_day,
            request_timeout: secs(get("REQUEST_TIMEOUT_SECS"), 10)
                .context("REQUEST_TIMEOUT_SECS is not a number")?,
            token_ttl: secs(get("TOKEN_TTL_SECS"), 86400)
                .context("TOKEN_TTL_SECS is not a number")?,
        })))
    }
}

fn secs(value: Option<String>, default: u64) -> Result<Duration, std::num::ParseIntError> {
    match value {
        Some(value) => value.trim().parse().map(Duration::from_secs),
        None => Ok(Duration::from_secs(default)),
    }
}
