use std::sync::LazyLock;

use thiserror::Error;
use tokio::sync::OnceCell;

pub const DEFAULT_FEEDBACK_THRESHOLD: i64 = 10;

static CONFIG: LazyLock<OnceCell<Config>> = LazyLock::new(OnceCell::new);

/// Process-wide configuration, read from the environment exactly once.
/// Concurrent first calls single-flight the load.
pub async fn config() -> ConfigResult<&'static Config> {
    CONFIG
        .get_or_try_init(|| async { Config::from_env() })
        .await
}

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub settings: KeeperSettings,
}

/// Policy values the keeper consults at grant time, split out so tests can
/// build a keeper without touching the environment.
#[derive(Debug, Clone)]
pub struct KeeperSettings {
    pub spam_message: String,
    pub peer_feedback_url: String,
    pub feedback_threshold: i64,
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        let redis_url = require("REDIS_URL")?;
        let spam_message = require("SPAM_MESSAGE")?;
        let peer_feedback_url = require("PEER_FEEDBACK_URL")?;
        let feedback_threshold = match dotenvy::var("FEEDBACK_THRESHOLD") {
            Ok(raw) => parse_threshold(&raw)?,
            Err(_) => DEFAULT_FEEDBACK_THRESHOLD,
        };

        Ok(Self {
            redis_url,
            settings: KeeperSettings {
                spam_message,
                peer_feedback_url,
                feedback_threshold,
            },
        })
    }
}

fn require(name: &'static str) -> ConfigResult<String> {
    dotenvy::var(name).map_err(|_| ConfigErr::MissingVar(name))
}

/// The modulo check at grant time is undefined for a non-positive threshold,
/// so bad values are rejected here instead of special-cased later.
fn parse_threshold(raw: &str) -> ConfigResult<i64> {
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigErr::InvalidThreshold(raw.to_owned()))?;

    if parsed < 1 {
        return Err(ConfigErr::InvalidThreshold(raw.to_owned()));
    }

    Ok(parsed)
}

pub type ConfigResult<T> = core::result::Result<T, ConfigErr>;

#[derive(Debug, Error)]
pub enum ConfigErr {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("FEEDBACK_THRESHOLD must be a positive integer, got '{0}'")]
    InvalidThreshold(String),
}
