//! In-process job queue between request handlers and the worker.

use tokio::sync::mpsc;

use crate::StatusChangedJob;

/// Receiving half consumed by [`crate::NotificationWorker::run`].
pub type JobReceiver = mpsc::UnboundedReceiver<StatusChangedJob>;

/// Cloneable enqueue handle.
///
/// Enqueueing never blocks and never fails the caller: a queue whose worker
/// has stopped only produces a warning.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<StatusChangedJob>,
}

impl NotificationQueue {
    /// Creates a queue and the receiver its worker drains.
    pub fn channel() -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Hands `job` to the worker. Returns false if the worker is gone.
    #[tracing::instrument(skip(self), fields(order_id = %job.order_id))]
    pub fn enqueue(&self, job: StatusChangedJob) -> bool {
        match self.sender.send(job) {
            Ok(()) => {
                metrics::counter!("notifications_enqueued_total").increment(1);
                tracing::debug!("notification enqueued");
                true
            }
            Err(_) => {
                tracing::warn!("notification queue closed, dropping job");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
