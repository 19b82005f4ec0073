use core::fmt;
use std::sync::LazyLock;

use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::instrument;

use crate::config::{ConfigErr, config};

static REDIS_POOL: LazyLock<OnceCell<RedisPool>> = LazyLock::new(OnceCell::new);

/// Shared connection handle, established on first use and reused for the
/// process lifetime. Concurrent first calls single-flight the setup so only
/// one connection is created.
pub async fn redis_pool() -> RedisResult<&'static RedisPool> {
    REDIS_POOL
        .get_or_try_init(|| async { RedisPool::new().await })
        .await
}

/// Key layout for everything the keeper persists.
#[derive(Debug, Clone, Copy)]
pub enum RedisKey<'a> {
    /// Per-user score hash: `score`, `joined_at`, `reason:*`, `given:*`.
    Record(&'a str),
    /// Global ranking sorted set, member = user name, score = score.
    Leaderboard,
    /// Append-only list of accepted grants.
    GrantEntries,
    /// Ordered (giver, receiver) pairs that have already transacted.
    GrantPairs,
}

impl fmt::Display for RedisKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedisKey::Record(name) => write!(f, "user:{name}:score"),
            RedisKey::Leaderboard => write!(f, "users:leaderboard"),
            RedisKey::GrantEntries => write!(f, "grants:log"),
            RedisKey::GrantPairs => write!(f, "grants:pairs"),
        }
    }
}

pub struct RedisPool {
    pub manager: ConnectionManager,
}

impl RedisPool {
    #[instrument]
    pub async fn new() -> RedisResult<Self> {
        let redis_url = &config().await?.redis_url;
        tracing::debug!(%redis_url, "connecting to redis server");

        let client = redis::Client::open(redis_url.as_str())?;
        let manager = ConnectionManager::new(client).await?;

        Ok(Self { manager })
    }
}

pub type RedisResult<T> = core::result::Result<T, RedisErr>;

#[derive(Debug, Error)]
pub enum RedisErr {
    #[error(transparent)]
    ConfigErr(#[from] ConfigErr),

    #[error(transparent)]
    RedisClientError(#[from] redis::RedisError),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error("malformed field '{field}' on record '{name}'")]
    BadField { name: String, field: String },
}
