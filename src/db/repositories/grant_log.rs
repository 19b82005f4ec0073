use core::fmt;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::instrument;

use super::GrantLog;
use crate::db::models::GrantLogEntry;
use crate::db::redis_pool::{RedisKey, RedisPool, RedisResult};

/// Redis-backed grant log: a set of ordered pairs for duplicate detection and
/// an append-only list of dated entries.
pub struct RedisGrantLog {
    pool: &'static RedisPool,
}

impl RedisGrantLog {
    pub fn new(pool: &'static RedisPool) -> Self {
        Self { pool }
    }

    async fn try_append(&self, entry: &GrantLogEntry) -> RedisResult<()> {
        let mut conn = self.pool.manager.clone();
        let payload = serde_json::to_string(entry)?;

        let _: () = conn
            .rpush(RedisKey::GrantEntries.to_string(), payload)
            .await?;
        Ok(())
    }
}

impl fmt::Debug for RedisGrantLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RedisGrantLog")
    }
}

#[async_trait]
impl GrantLog for RedisGrantLog {
    #[instrument(skip(self))]
    async fn has_prior_grant(&self, from: &str, to: &str) -> RedisResult<bool> {
        let mut conn = self.pool.manager.clone();
        let member = GrantLogEntry::pair_member(from, to);

        Ok(conn
            .sismember(RedisKey::GrantPairs.to_string(), member)
            .await?)
    }

    #[instrument(skip(self))]
    async fn claim_pair(&self, from: &str, to: &str) -> RedisResult<bool> {
        let mut conn = self.pool.manager.clone();
        let member = GrantLogEntry::pair_member(from, to);

        // SADD is the conditional insert: 1 means this call took the pair
        let inserted: i64 = conn.sadd(RedisKey::GrantPairs.to_string(), member).await?;
        Ok(inserted == 1)
    }

    #[instrument(skip(self))]
    async fn append(&self, from: &str, to: &str) {
        let entry = GrantLogEntry::new(from, to);

        if let Err(e) = self.try_append(&entry).await {
            tracing::warn!(from, to, error = ?e, "failed saving grant log entry");
        }
    }
}
