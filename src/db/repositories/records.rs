use core::fmt;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::instrument;

use super::RecordStore;
use crate::db::models::{
    FIELD_JOINED_AT, FIELD_NAME, FIELD_SCORE, GIVEN_PREFIX, NEVER_SCORED, REASON_PREFIX,
    ScoreDelta, ScoreRecord,
};
use crate::db::redis_pool::{RedisKey, RedisPool, RedisResult};
use crate::util::names::clean_name;

/// Redis-backed record store. One hash per user plus a global sorted set
/// mirroring every score, maintained in the same MULTI/EXEC pipeline as the
/// hash so ranked reads stay a single ZRANGE away.
pub struct RedisRecordStore {
    pool: &'static RedisPool,
}

impl RedisRecordStore {
    pub fn new(pool: &'static RedisPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, names: &[String]) -> RedisResult<Vec<ScoreRecord>> {
        let mut conn = self.pool.manager.clone();

        let mut records = Vec::with_capacity(names.len());
        for name in names {
            let fields: HashMap<String, String> =
                conn.hgetall(RedisKey::Record(name).to_string()).await?;

            // a leaderboard member whose hash was dropped out-of-band is
            // skipped rather than invented
            if fields.is_empty() {
                tracing::warn!(%name, "leaderboard member without a score record");
                continue;
            }

            records.push(ScoreRecord::from_fields(name, &fields)?);
        }

        Ok(records)
    }
}

impl fmt::Debug for RedisRecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RedisRecordStore")
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    #[instrument(skip(self))]
    async fn get_or_create(&self, name: &str) -> RedisResult<ScoreRecord> {
        let mut conn = self.pool.manager.clone();
        let key = RedisKey::Record(name).to_string();
        let now = Utc::now().to_rfc3339();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset_nx(&key, FIELD_NAME, name).ignore();
        pipe.hset_nx(&key, FIELD_SCORE, 0).ignore();
        pipe.hset_nx(&key, FIELD_JOINED_AT, &now).ignore();
        pipe.cmd("ZADD")
            .arg(RedisKey::Leaderboard.to_string())
            .arg("NX")
            .arg(0)
            .arg(name)
            .ignore();
        pipe.hgetall(&key);

        let (fields,): (HashMap<String, String>,) = pipe.query_async(&mut conn).await?;
        ScoreRecord::from_fields(name, &fields)
    }

    #[instrument(skip(self))]
    async fn apply_delta(&self, name: &str, delta: &ScoreDelta) -> RedisResult<ScoreRecord> {
        let mut conn = self.pool.manager.clone();
        let key = RedisKey::Record(name).to_string();
        let now = Utc::now().to_rfc3339();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset_nx(&key, FIELD_NAME, name).ignore();
        pipe.hset_nx(&key, FIELD_JOINED_AT, &now).ignore();
        pipe.hincr(&key, FIELD_SCORE, delta.score).ignore();
        if let Some(reason) = &delta.reason {
            pipe.hincr(&key, format!("{REASON_PREFIX}{reason}"), delta.score)
                .ignore();
        }
        pipe.zincr(RedisKey::Leaderboard.to_string(), name, delta.score)
            .ignore();
        pipe.hgetall(&key);

        let (fields,): (HashMap<String, String>,) = pipe.query_async(&mut conn).await?;
        ScoreRecord::from_fields(name, &fields)
    }

    #[instrument(skip(self))]
    async fn record_given(&self, giver: &str, recipient: &str, delta: i64) -> RedisResult<i64> {
        let mut conn = self.pool.manager.clone();
        let key = RedisKey::Record(giver).to_string();
        let field = format!("{GIVEN_PREFIX}{}", clean_name(recipient));
        let now = Utc::now().to_rfc3339();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hset_nx(&key, FIELD_NAME, giver).ignore();
        pipe.hset_nx(&key, FIELD_SCORE, 0).ignore();
        pipe.hset_nx(&key, FIELD_JOINED_AT, &now).ignore();
        pipe.cmd("ZADD")
            .arg(RedisKey::Leaderboard.to_string())
            .arg("NX")
            .arg(0)
            .arg(giver)
            .ignore();
        pipe.hincr(&key, &field, delta);

        let (total,): (i64,) = pipe.query_async(&mut conn).await?;
        Ok(total)
    }

    #[instrument(skip(self))]
    async fn erase(&self, name: &str) -> RedisResult<()> {
        let mut conn = self.pool.manager.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(RedisKey::Record(name).to_string()).ignore();
        pipe.zrem(RedisKey::Leaderboard.to_string(), name).ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    /// The initial read is not atomic with the pipeline; a grant landing in
    /// between keeps its own delta intact and only the read count is removed.
    #[instrument(skip(self))]
    async fn erase_reason(&self, name: &str, reason: &str) -> RedisResult<()> {
        let mut conn = self.pool.manager.clone();
        let key = RedisKey::Record(name).to_string();
        let field = format!("{REASON_PREFIX}{reason}");

        let count: Option<i64> = conn.hget(&key, &field).await?;
        let Some(count) = count else {
            return Ok(());
        };

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.hincr(&key, FIELD_SCORE, -count).ignore();
        pipe.hdel(&key, &field).ignore();
        pipe.zincr(RedisKey::Leaderboard.to_string(), name, -count)
            .ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn top(&self, n: usize) -> RedisResult<Vec<ScoreRecord>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.manager.clone();
        let names: Vec<String> = conn
            .zrevrange(RedisKey::Leaderboard.to_string(), 0, n as isize - 1)
            .await?;

        self.hydrate(&names).await
    }

    #[instrument(skip(self))]
    async fn bottom(&self, n: usize) -> RedisResult<Vec<ScoreRecord>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.manager.clone();
        let names: Vec<String> = conn
            .zrangebyscore_limit(
                RedisKey::Leaderboard.to_string(),
                format!("({NEVER_SCORED}"),
                "+inf",
                0,
                n as isize,
            )
            .await?;

        self.hydrate(&names).await
    }
}
