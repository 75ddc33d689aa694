use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::services::email::{Email, EmailService};

/// Bounded queue of outgoing emails drained by a small worker pool.
///
/// Requests never wait on delivery: `submit` drops the email when the queue is
/// full. Without an SMTP sender the emails are only logged.
#[derive(Clone)]
pub struct EmailJobQueue {
    tx: mpsc::Sender<Email>,
}

impl EmailJobQueue {
    /// Must be called from within a tokio runtime; the worker pool is spawned here.
    pub fn new(sender: Option<EmailService>, queue_size: usize, max_concurrent: usize) -> Self {
        let queue_size = queue_size.max(1);
        let max_concurrent = max_concurrent.max(1);
        let (tx, rx) = mpsc::channel(queue_size);

        let smtp = sender.is_some();
        tokio::spawn(async move {
            Self::worker_pool(rx, sender, max_concurrent).await;
        });

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            smtp = smtp,
            "Email job queue initialized"
        );

        Self { tx }
    }

    #[tracing::instrument(skip(self, email), fields(email.subject = %email.subject))]
    pub fn submit(&self, email: Email) {
        if let Err(e) = self.tx.try_send(email) {
            match e {
                mpsc::error::TrySendError::Full(dropped) => {
                    tracing::warn!(subject = %dropped.subject, "Email queue is full, dropping email");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::error!("Email queue is closed");
                }
            }
        }
    }

    pub fn submit_all(&self, emails: impl IntoIterator<Item = Email>) {
        for email in emails {
            self.submit(email);
        }
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<Email>,
        sender: Option<EmailService>,
        max_concurrent: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        while let Some(email) = rx.recv().await {
            let permit = semaphore.clone().acquire_owned().await;
            let sender = sender.clone();

            tokio::spawn(async move {
                let _permit = permit;
                match sender {
                    Some(sender) => {
                        if let Err(e) = sender.send(&email).await {
                            tracing::error!(error = %e, subject = %email.subject, "Email delivery failed");
                        }
                    }
                    None => {
                        tracing::info!(
                            subject = %email.subject,
                            recipient = %email.recipient_name,
                            "Email not sent (SMTP not configured)"
                        );
                    }
                }
            });
        }
        tracing::debug!("Email queue closed, worker pool exiting");
    }
}
