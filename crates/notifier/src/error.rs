//! Notification error types.

use common::{TravelOrderId, UserId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The order vanished (or was deleted) before the job ran.
    #[error("Travel order not found: {0}")]
    OrderNotFound(TravelOrderId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The mailer could not deliver the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
