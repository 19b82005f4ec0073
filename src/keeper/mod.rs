use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::config::{ConfigErr, KeeperSettings, config};
use crate::db::models::{ScoreDelta, ScoreRecord};
use crate::db::redis_pool::{RedisErr, redis_pool};
use crate::db::repositories::{GrantLog, RecordStore, RedisGrantLog, RedisRecordStore};
use crate::notify::Notifier;


/// Outcome of a grant or revoke attempt. Rejections are normal control flow,
/// not errors; store failures are logged and carried in [`Failed`] rather
/// than raised, so callers always get a value back.
///
/// [`Failed`]: GrantOutcome::Failed
#[derive(Debug)]
pub enum GrantOutcome {
    Accepted {
        /// Receiver's score after the delta.
        score: i64,
        /// Post-update count for the supplied reason; `None` when no reason
        /// was given.
        reason_count: Option<i64>,
        record: ScoreRecord,
    },
    RejectedSelfGrant,
    RejectedDuplicate,
    Failed(KeeperErr),
}

pub type KeeperResult<T> = core::result::Result<T, KeeperErr>;

#[derive(Debug, Error)]
pub enum KeeperErr {
    #[error(transparent)]
    RedisErr(#[from] RedisErr),

    #[error(transparent)]
    ConfigErr(#[from] ConfigErr),
}

/// Orchestrates score mutations: validates grants, applies deltas, keeps the
/// giver ledger current and logs accepted transactions.
pub struct ScoreKeeper {
    records: Arc<dyn RecordStore>,
    grant_log: Arc<dyn GrantLog>,
    notifier: Arc<dyn Notifier>,
    settings: KeeperSettings,
}

impl ScoreKeeper {
    pub fn new(
        records: Arc<dyn RecordStore>,
        grant_log: Arc<dyn GrantLog>,
        notifier: Arc<dyn Notifier>,
        settings: KeeperSettings,
    ) -> Self {
        Self {
            records,
            grant_log,
            notifier,
            settings,
        }
    }

    /// Redis-backed keeper on the process-wide connection, with policy values
    /// from the environment.
    pub async fn from_config(notifier: Arc<dyn Notifier>) -> KeeperResult<Self> {
        let settings = config().await?.settings.clone();
        let pool = redis_pool().await?;

        Ok(Self::new(
            Arc::new(RedisRecordStore::new(pool)),
            Arc::new(RedisGrantLog::new(pool)),
            notifier,
            settings,
        ))
    }

    /// Grants one point to `to` on behalf of `from`.
    #[instrument(skip(self))]
    pub async fn grant(
        &self,
        to: &str,
        from: &str,
        room: &str,
        reason: Option<&str>,
    ) -> GrantOutcome {
        self.apply(to, from, room, reason, 1).await
    }

    /// Takes one point from `to` on behalf of `from`. Same mechanics as
    /// [`grant`](Self::grant) with the sign inverted, including the
    /// once-per-pair guard.
    #[instrument(skip(self))]
    pub async fn revoke(
        &self,
        to: &str,
        from: &str,
        room: &str,
        reason: Option<&str>,
    ) -> GrantOutcome {
        self.apply(to, from, room, reason, -1).await
    }

    async fn apply(
        &self,
        to: &str,
        from: &str,
        room: &str,
        reason: Option<&str>,
        delta: i64,
    ) -> GrantOutcome {
        match self.try_apply(to, from, reason, delta).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(to, from, room, reason, delta, error = ?e, "score mutation failure");
                GrantOutcome::Failed(e)
            }
        }
    }

    async fn try_apply(
        &self,
        to: &str,
        from: &str,
        reason: Option<&str>,
        delta: i64,
    ) -> KeeperResult<GrantOutcome> {
        let to_user = self.records.get_or_create(to).await?;

        if to_user.name == from {
            return Ok(GrantOutcome::RejectedSelfGrant);
        }

        if !self.grant_log.claim_pair(from, &to_user.name).await? {
            tracing::debug!(from, to = %to_user.name, "repeat grant blocked");
            self.message_user(from, &self.settings.spam_message).await;
            return Ok(GrantOutcome::RejectedDuplicate);
        }

        self.record_points_given(from, &to_user.name, delta).await?;

        let reason = reason.filter(|r| !r.is_empty());
        let delta = ScoreDelta::new(delta, reason);
        let record = self.records.apply_delta(&to_user.name, &delta).await?;

        self.grant_log.append(from, &to_user.name).await;

        let reason_count = delta
            .reason
            .as_deref()
            .and_then(|r| record.reasons.get(r).copied());

        Ok(GrantOutcome::Accepted {
            score: record.score,
            reason_count,
            record,
        })
    }

    /// Bumps the giver's cumulative ledger and nudges them toward written
    /// feedback each time a positive grant lands exactly on the threshold.
    ///
    /// The crossing decision uses this call's post-increment total, so a
    /// re-issued increment cannot re-fire for an earlier crossing.
    async fn record_points_given(&self, from: &str, to: &str, delta: i64) -> KeeperResult<()> {
        let total = self.records.record_given(from, to, delta).await?;

        if delta == 1 && total % self.settings.feedback_threshold == 0 {
            tracing::debug!(from, to, total, "feedback threshold crossed");
            let message = format!(
                "Looks like you've given {} quite a few points, maybe you should look at submitting a {}",
                to, self.settings.peer_feedback_url
            );
            self.message_user(from, &message).await;
        }

        Ok(())
    }

    async fn message_user(&self, user: &str, message: &str) {
        if let Err(e) = self.notifier.message_user(user, message).await {
            tracing::warn!(user, error = ?e, "notification delivery failure");
        }
    }

    pub async fn score_for(&self, name: &str) -> KeeperResult<i64> {
        Ok(self.records.get_or_create(name).await?.score)
    }

    pub async fn reasons_for(&self, name: &str) -> KeeperResult<BTreeMap<String, i64>> {
        Ok(self.records.get_or_create(name).await?.reasons)
    }

    /// Up to `n` records, highest score first.
    #[instrument(skip(self))]
    pub async fn top(&self, n: usize) -> KeeperResult<Vec<ScoreRecord>> {
        Ok(self.records.top(n).await?)
    }

    /// Up to `n` records, lowest score first. Never-scored guard values are
    /// excluded.
    #[instrument(skip(self))]
    pub async fn bottom(&self, n: usize) -> KeeperResult<Vec<ScoreRecord>> {
        Ok(self.records.bottom(n).await?)
    }

    /// Removes `name`'s record, or only one reason's contribution when a
    /// reason is given. A missing user is not an error; erase always reports
    /// success.
    #[instrument(skip(self))]
    pub async fn erase(
        &self,
        name: &str,
        by: &str,
        room: &str,
        reason: Option<&str>,
    ) -> KeeperResult<bool> {
        match reason.filter(|r| !r.is_empty()) {
            Some(reason) => {
                tracing::debug!(name, by, room, reason, "erasing reason-scoped score");
                self.records.erase_reason(name, reason).await?;
            }
            None => {
                tracing::debug!(name, by, room, "erasing all scores");
                self.records.erase(name).await?;
            }
        }

        Ok(true)
    }
}
