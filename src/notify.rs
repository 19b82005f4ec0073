use core::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Outbound message seam owned by the chat transport. The keeper only decides
/// when to send and what to say; delivery, identity resolution and formatting
/// quirks of the chat service stay on the other side of this trait.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    async fn message_user(&self, user: &str, message: &str) -> NotifyResult<()>;
}

pub type NotifyResult<T> = core::result::Result<T, NotifyErr>;

#[derive(Debug, Error)]
pub enum NotifyErr {
    #[error("message delivery failure: {0}")]
    Delivery(String),
}
