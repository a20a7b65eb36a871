//! Background worker delivering status-change notifications.

use std::time::Duration;

use common::Locale;
use store::{OrderStore, UserDirectory};
use tokio::task::JoinHandle;

use crate::{JobReceiver, MailMessage, Mailer, NotifyError, Result, StatusChangedJob};

/// Settings for [`NotificationWorker`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the frontend, used for the "view order" link.
    pub app_url: String,
    pub locale: Locale,
    /// Total delivery attempts per job, at least 1.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:9000".to_string(),
            locale: Locale::En,
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// What happened to a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered,
    /// The order was gone by the time the job ran.
    Skipped,
    Failed,
}

/// Consumes [`StatusChangedJob`]s and mails the owner of each order.
///
/// Failures stay inside the worker: they are retried, logged and counted,
/// never reported back to the request that enqueued the job.
pub struct NotificationWorker<S, M>
where
    S: OrderStore + UserDirectory,
    M: Mailer,
{
    store: S,
    mailer: M,
    config: WorkerConfig,
}

impl<S, M> NotificationWorker<S, M>
where
    S: OrderStore + UserDirectory + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: S, mailer: M, config: WorkerConfig) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// Runs the worker on its own task until every queue handle is dropped.
    pub fn spawn(self, jobs: JobReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(jobs))
    }

    /// Drains `jobs` until every queue handle is dropped.
    pub async fn run(self, mut jobs: JobReceiver) {
        tracing::info!("notification worker started");

        while let Some(job) = jobs.recv().await {
            self.process(job).await;
        }

        tracing::info!("notification queue closed, worker stopping");
    }

    /// Handles one job, absorbing any failure.
    #[tracing::instrument(skip(self), fields(order_id = %job.order_id, from = %job.from, to = %job.to))]
    pub async fn process(&self, job: StatusChangedJob) -> JobOutcome {
        match self.handle(job).await {
            Ok(()) => {
                metrics::counter!("notifications_sent_total").increment(1);
                tracing::info!("notification delivered");
                JobOutcome::Delivered
            }
            Err(NotifyError::OrderNotFound(_)) => {
                tracing::info!("order no longer exists, skipping notification");
                JobOutcome::Skipped
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::error!(error = %e, "notification dropped");
                JobOutcome::Failed
            }
        }
    }

    async fn handle(&self, job: StatusChangedJob) -> Result<()> {
        let order = self
            .store
            .find(job.order_id)
            .await?
            .ok_or(NotifyError::OrderNotFound(job.order_id))?;
        let user = self
            .store
            .find_user(order.user_id)
            .await?
            .ok_or(NotifyError::UserNotFound(order.user_id))?;

        let message = MailMessage::status_changed(
            &order,
            &user,
            job.from,
            job.to,
            &self.config.app_url,
            self.config.locale,
        );

        self.deliver(&message).await
    }

    async fn deliver(&self, message: &MailMessage) -> Result<()> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.mailer.send(message).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(attempt, max_attempts, error = %e, "delivery failed, retrying");
                    tokio::time::sleep(self.config.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
