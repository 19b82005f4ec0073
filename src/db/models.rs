use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::redis_pool::{RedisErr, RedisResult};

pub const FIELD_NAME: &str = "name";
pub const FIELD_SCORE: &str = "score";
pub const FIELD_JOINED_AT: &str = "joined_at";
pub const REASON_PREFIX: &str = "reason:";
pub const GIVEN_PREFIX: &str = "given:";

/// Guard value for members that have never actually scored; bottom-N reads
/// exclude it with an exclusive lower bound.
pub const NEVER_SCORED: i64 = i64::MIN;

/// One user's full score state, rebuilt from the flat hash fields stored in
/// redis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub score: i64,
    pub reasons: BTreeMap<String, i64>,
    pub points_given: BTreeMap<String, i64>,
    pub joined_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn from_fields(name: &str, fields: &HashMap<String, String>) -> RedisResult<Self> {
        let joined_at = fields
            .get(FIELD_JOINED_AT)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| bad_field(name, FIELD_JOINED_AT))?;

        let mut score = 0;
        let mut reasons = BTreeMap::new();
        let mut points_given = BTreeMap::new();

        for (field, raw) in fields {
            match field.as_str() {
                FIELD_NAME | FIELD_JOINED_AT => continue,
                FIELD_SCORE => score = parse_count(name, field, raw)?,
                other => {
                    if let Some(label) = other.strip_prefix(REASON_PREFIX) {
                        reasons.insert(label.to_owned(), parse_count(name, field, raw)?);
                    } else if let Some(recipient) = other.strip_prefix(GIVEN_PREFIX) {
                        points_given.insert(recipient.to_owned(), parse_count(name, field, raw)?);
                    }
                }
            }
        }

        Ok(Self {
            name: name.to_owned(),
            score,
            reasons,
            points_given,
            joined_at,
        })
    }
}

fn parse_count(name: &str, field: &str, raw: &str) -> RedisResult<i64> {
    raw.parse().map_err(|_| bad_field(name, field))
}

fn bad_field(name: &str, field: &str) -> RedisErr {
    RedisErr::BadField {
        name: name.to_owned(),
        field: field.to_owned(),
    }
}

/// Field increments applied to a record in one atomic step.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDelta {
    pub score: i64,
    pub reason: Option<String>,
}

impl ScoreDelta {
    pub fn new(score: i64, reason: Option<&str>) -> Self {
        Self {
            score,
            reason: reason.map(str::to_owned),
        }
    }
}

/// Append-only record of an accepted grant. Entries are never mutated or
/// deleted by normal operation; erasing a user's score leaves their entries
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantLogEntry {
    pub from: String,
    pub to: String,
    pub date: DateTime<Utc>,
}

impl GrantLogEntry {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_owned(),
            to: to.to_owned(),
            date: Utc::now(),
        }
    }

    /// Set member carrying the (giver, receiver) uniqueness constraint. The
    /// pair is ordered; `a->b` and `b->a` are distinct grants.
    pub fn pair_member(from: &str, to: &str) -> String {
        format!("{from}->{to}")
    }
}
