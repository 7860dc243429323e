use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// An outbound message to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivery channel for account notifications (reset links, username reminders).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the application log. Used when no transport is
/// configured and as the fallback when delivery fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            body = %notification.body,
            "notification (log delivery)"
        );
        Ok(())
    }
}

/// POSTs notifications as JSON to an HTTP endpoint (a mail relay or chat hook).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .context("Webhook request failed")?
            .error_for_status()
            .context("Webhook rejected notification")?;
        Ok(())
    }
}

/// Deliver through `notifier`, giving up after `timeout`.
///
/// Failures and timeouts are logged and the message goes to the log
/// instead; callers never see a delivery error.
pub async fn dispatch(notifier: &dyn Notifier, notification: &Notification, timeout: Duration) {
    let outcome = tokio::time::timeout(timeout, notifier.send(notification)).await;
    let failure = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(err)) => format!("{:#}", err),
        Err(_) => format!("timed out after {} ms", timeout.as_millis()),
    };

    tracing::warn!(
        recipient = %notification.recipient,
        error = %failure,
        "notification delivery failed, falling back to log"
    );
    // LogNotifier cannot fail
    let _ = LogNotifier.send(notification).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing(AtomicUsize);

    #[async_trait]
    impl Notifier for Failing {
        async fn send(&self, _notification: &Notification) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("smtp down")
        }
    }

    struct Stalled;

    #[async_trait]
    impl Notifier for Stalled {
        async fn send(&self, _notification: &Notification) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn message() -> Notification {
        Notification {
            recipient: "alice@example.com".into(),
            subject: "Reset".into(),
            body: "token".into(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let notifier = Failing(AtomicUsize::new(0));
        dispatch(&notifier, &message(), Duration::from_secs(1)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_is_bounded() {
        let started = std::time::Instant::now();
        dispatch(&Stalled, &message(), Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
