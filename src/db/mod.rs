pub mod models;
pub mod redis_pool;
pub mod repositories;

pub mod prelude {
    pub use super::models::{GrantLogEntry, ScoreDelta, ScoreRecord};
    pub use super::redis_pool::{RedisErr, RedisKey, RedisPool, RedisResult, redis_pool};
    pub use super::repositories::{GrantLog, RecordStore, RedisGrantLog, RedisRecordStore};
}
