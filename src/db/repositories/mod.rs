use core::fmt;

use async_trait::async_trait;

use super::models::{ScoreDelta, ScoreRecord};
use super::redis_pool::RedisResult;

mod grant_log;
mod records;

pub use grant_log::RedisGrantLog;
pub use records::RedisRecordStore;

/// Persistence seam for user score records, the giver ledger and ranked
/// reads. Every mutation is a single atomic increment-or-create at the store,
/// so callers never hold a read-then-write race on one record.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Returns the existing record or creates one with score 0, empty maps
    /// and the current timestamp. Concurrent first-touches of the same name
    /// produce exactly one record.
    async fn get_or_create(&self, name: &str) -> RedisResult<ScoreRecord>;

    /// Atomically applies the delta (score and optional reason bucket),
    /// creating the record first if absent, and returns the post-update
    /// snapshot.
    async fn apply_delta(&self, name: &str, delta: &ScoreDelta) -> RedisResult<ScoreRecord>;

    /// Atomically bumps the giver's cumulative count toward `recipient` and
    /// returns the post-increment total. Threshold decisions downstream are
    /// derived from this returned value, not from a re-read.
    async fn record_given(&self, giver: &str, recipient: &str, delta: i64) -> RedisResult<i64>;

    /// Removes the whole record. Deleting a missing user is a quiet no-op.
    async fn erase(&self, name: &str) -> RedisResult<()>;

    /// Removes one reason's contribution: its recorded count is subtracted
    /// from the score and the bucket is deleted.
    async fn erase_reason(&self, name: &str, reason: &str) -> RedisResult<()>;

    /// Up to `n` records, highest score first.
    async fn top(&self, n: usize) -> RedisResult<Vec<ScoreRecord>>;

    /// Up to `n` records, lowest score first, never-scored guard values
    /// excluded.
    async fn bottom(&self, n: usize) -> RedisResult<Vec<ScoreRecord>>;
}

/// Duplicate-grant bookkeeping. A single historical grant permanently blocks
/// the ordered (giver, receiver) pair; there is no time window or decay.
#[async_trait]
pub trait GrantLog: Send + Sync + fmt::Debug {
    /// Whether the ordered pair has ever transacted.
    async fn has_prior_grant(&self, from: &str, to: &str) -> RedisResult<bool>;

    /// Atomically claims the ordered pair. `false` means a prior grant
    /// already holds it; concurrent claims resolve to exactly one winner.
    async fn claim_pair(&self, from: &str, to: &str) -> RedisResult<bool>;

    /// Appends a dated log entry. Best-effort: failures are logged and
    /// swallowed by the implementation, never surfaced to the caller.
    async fn append(&self, from: &str, to: &str);
}
