//! Travel order notifications.
//!
//! Request handlers enqueue a [`StatusChangedJob`] on a [`NotificationQueue`]
//! after a status change lands. A [`NotificationWorker`] running on its own
//! task loads the order and its owner, renders a [`MailMessage`] and hands it
//! to a [`Mailer`], retrying failed deliveries with a fixed backoff.

pub mod error;
pub mod job;
pub mod mailer;
pub mod message;
pub mod queue;
pub mod worker;

pub use error::{NotifyError, Result};
pub use job::StatusChangedJob;
pub use mailer::{InMemoryMailer, LogMailer, Mailer};
pub use message::{MailAction, MailMessage};
pub use queue::{JobReceiver, NotificationQueue};
pub use worker::{JobOutcome, NotificationWorker, WorkerConfig};
