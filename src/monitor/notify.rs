//! Notification dispatch
//!
//! Delivery is fire-and-forget and at-most-once. Each sink gets its own task
//! per notification; a failure is logged and never retried, since a retried
//! emergency can reach the crew twice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::models::{EmergencyEvent, SafetyAlert};
use crate::error::NotifyError;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// What the engine hands to the host's notification surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    Alert(SafetyAlert),
    Emergency(EmergencyEvent),
}

/// A delivery target injected by the host
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification {
            Notification::Alert(alert) => info!(
                alert_id = %alert.id,
                severity = alert.severity.label(),
                score = alert.risk_score,
                "{}: {}",
                alert.title,
                alert.description
            ),
            Notification::Emergency(event) => warn!(
                event_id = %event.id,
                score = event.risk_score,
                factors = event.contributing_factors.len(),
                "EMERGENCY: risk level {}",
                event.overall_level
            ),
        }
        Ok(())
    }
}

/// POSTs each notification as JSON
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}

/// Forwards notifications to an in-process receiver
pub struct ChannelSink {
    tx: mpsc::Sender<Notification>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    fn name(&self) -> &str {
        "channel"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.tx
            .try_send(notification.clone())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => NotifyError::Delivery("channel full".into()),
                mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
            })
    }
}

/// Fans notifications out to every registered sink
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Spawn one delivery per sink and return immediately
    pub fn dispatch(&self, notification: Notification) {
        let notification = Arc::new(notification);
        for sink in &self.sinks {
            let sink = Arc::clone(sink);
            let notification = Arc::clone(&notification);
            tokio::spawn(async move {
                if let Err(e) = sink.deliver(&notification).await {
                    warn!(sink = sink.name(), error = %e, "Notification delivery failed, not retrying");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::models::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn alert() -> SafetyAlert {
        let factor = RiskFactor::new(
            RiskType::Weather,
            Hazard::HighWind,
            Severity::High,
            7.0,
            "Wind speed 30 mph",
            "Suspend climbing",
        );
        SafetyAlert::from_factor(&factor, "cycle-1", Utc::now())
    }

    struct FailingSink {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NotificationSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _notification: &Notification) -> Result<(), NotifyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::Delivery("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (tx, mut rx) = mpsc::channel(4);
        let dispatcher = NotificationDispatcher::new().with_sink(Arc::new(ChannelSink::new(tx)));

        dispatcher.dispatch(Notification::Alert(alert()));

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, Notification::Alert(a) if a.title == "High Weather Risk"));
    }

    #[tokio::test]
    async fn test_failure_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel(4);
        let dispatcher = NotificationDispatcher::new()
            .with_sink(Arc::new(FailingSink {
                attempts: Arc::clone(&attempts),
            }))
            .with_sink(Arc::new(ChannelSink::new(tx)));

        dispatcher.dispatch(Notification::Alert(alert()));

        // The healthy sink still receives it
        assert!(rx.recv().await.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_webhook_sink_builds() {
        let sink = WebhookSink::new("http://localhost:9000/hook").unwrap();
        assert_eq!(sink.name(), "webhook");
        assert_eq!(sink.url, "http://localhost:9000/hook");
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = ChannelSink::new(tx);
        let err = sink.deliver(&Notification::Alert(alert())).await.unwrap_err();
        assert!(matches!(err, NotifyError::Closed));
    }

    #[test]
    fn test_notification_json_shape() {
        let json = serde_json::to_value(Notification::Alert(alert())).unwrap();
        assert_eq!(json["kind"], "alert");
        assert_eq!(json["payload"]["type"], "weather");
        assert_eq!(json["payload"]["severity"], "high");
    }
}
