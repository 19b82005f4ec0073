//! Karma score engine for a chat community.
//!
//! Tracks per-user scores granted by other users, attributes them by reason,
//! blocks repeat grants between the same (giver, receiver) pair, keeps a
//! giver-side ledger of points handed out, and serves ranked leaderboards.
//!
//! The chat transport is the caller's concern. Commands arrive here already
//! resolved to a `(to, from, room, reason)` tuple, and outbound messages leave
//! through the [`notify::Notifier`] seam. State lives in redis behind a shared
//! [`db::redis_pool`] connection established lazily on first use.

pub mod config;
pub mod db;
pub mod keeper;
pub mod notify;
pub mod util;

pub use config::{Config, KeeperSettings};
pub use db::models::{GrantLogEntry, ScoreDelta, ScoreRecord};
pub use db::repositories::{GrantLog, RecordStore, RedisGrantLog, RedisRecordStore};
pub use keeper::{GrantOutcome, KeeperErr, KeeperResult, ScoreKeeper};
pub use notify::{Notifier, NotifyErr, NotifyResult};
