//! Fire-and-forget notification dispatch

use dms::NotificationRequest;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::channel::NotificationChannel;
use crate::NotifyError;

/// Queue and timeout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Pending notifications held before new ones are dropped
    pub queue_capacity: usize,
    /// Longest a single delivery may take before it counts as failed
    pub delivery_timeout_ms: u64,
    /// Longest `shutdown` waits for the queue to drain
    pub drain_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            delivery_timeout_ms: 10_000,
            drain_timeout_ms: 30_000,
        }
    }
}

impl DispatchConfig {
    pub fn with_capacity(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            ..Default::default()
        }
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// Delivery outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: u64,
    pub failed: u64,
    /// Rejected at submit time (queue full or closed)
    pub dropped: u64,
    /// Still queued or in flight when the drain timed out
    pub abandoned: u64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DeliveryStats {
        let delivered = self.delivered.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        DeliveryStats {
            delivered,
            failed,
            dropped: self.dropped.load(Ordering::Relaxed),
            abandoned: self
                .accepted
                .load(Ordering::Relaxed)
                .saturating_sub(delivered + failed),
        }
    }
}

/// Queues notification requests for a background delivery task.
///
/// `submit` never blocks the frame loop. Failed or timed-out deliveries are
/// logged and counted, never retried.
pub struct NotificationDispatcher {
    sender: mpsc::Sender<NotificationRequest>,
    worker: JoinHandle<()>,
    counters: Arc<Counters>,
    drain_timeout: Duration,
}

impl NotificationDispatcher {
    /// Spawn the delivery task on the current tokio runtime
    pub fn spawn<C: NotificationChannel>(channel: C, config: &DispatchConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let delivery_timeout = config.delivery_timeout();
        let (sender, mut receiver) = mpsc::channel::<NotificationRequest>(capacity);
        info!(
            channel = channel.name(),
            capacity,
            delivery_timeout_ms = config.delivery_timeout_ms,
            "Starting notification dispatcher"
        );

        let counters = Arc::new(Counters::default());
        let worker_counters = counters.clone();
        let worker = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let kind = request.kind.label();
                let result = tokio::time::timeout(delivery_timeout, channel.deliver(&request))
                    .await
                    .unwrap_or(Err(NotifyError::Timeout(delivery_timeout)));

                match result {
                    Ok(id) => {
                        worker_counters.delivered.fetch_add(1, Ordering::Relaxed);
                        metrics::counter!("fatigue_notifications_delivered_total", "kind" => kind)
                            .increment(1);
                        info!(kind, recipient = %request.recipient, "Alert notification sent: {}", id);
                    }
                    Err(e) => {
                        worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        metrics::counter!("fatigue_notifications_failed_total", "kind" => kind)
                            .increment(1);
                        error!(
                            kind,
                            recipient = %request.recipient,
                            channel = channel.name(),
                            "Notification delivery failed: {}",
                            e
                        );
                    }
                }
            }
            channel.close().await;
        });

        Self {
            sender,
            worker,
            counters,
            drain_timeout: config.drain_timeout(),
        }
    }

    /// Queue a request; returns false if it was dropped
    pub fn submit(&self, request: NotificationRequest) -> bool {
        let (reason, request) = match self.sender.try_send(request) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                return true;
            }
            Err(TrySendError::Full(request)) => ("queue full", request),
            Err(TrySendError::Closed(request)) => ("dispatcher closed", request),
        };

        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("fatigue_notifications_dropped_total").increment(1);
        warn!(
            kind = request.kind.label(),
            recipient = %request.recipient,
            "Notification dropped: {}",
            reason
        );
        false
    }

    /// Queue every request, returning how many were accepted
    pub fn submit_all(&self, requests: impl IntoIterator<Item = NotificationRequest>) -> usize {
        requests
            .into_iter()
            .map(|request| self.submit(request))
            .filter(|&accepted| accepted)
            .count()
    }

    /// Close the queue and wait, at most the drain timeout, for queued
    /// requests to be delivered and the channel flushed
    pub async fn shutdown(self) -> DeliveryStats {
        let Self {
            sender,
            mut worker,
            counters,
            drain_timeout,
        } = self;
        drop(sender);

        match tokio::time::timeout(drain_timeout, &mut worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Notification worker ended abnormally: {}", e),
            Err(_) => {
                worker.abort();
                warn!(
                    "Notification drain timed out after {:?}; abandoning queued requests",
                    drain_timeout
                );
            }
        }

        let stats = counters.snapshot();
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            dropped = stats.dropped,
            abandoned = stats.abandoned,
            "Notification dispatcher stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms::{AlertKind, NotificationKind};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn request(recipient: &str) -> NotificationRequest {
        NotificationRequest {
            kind: NotificationKind::Onset(AlertKind::Yawn),
            message: "ALERT! Yawn detected!".into(),
            recipient: recipient.into(),
        }
    }

    #[derive(Clone, Default)]
    struct RecordingChannel {
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicU64>,
    }

    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn deliver(&self, request: &NotificationRequest) -> Result<String, NotifyError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(request.recipient.clone());
            Ok(format!("msg-{}", sent.len()))
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Fails every other delivery
    #[derive(Default)]
    struct FlakyChannel {
        calls: AtomicU64,
    }

    impl NotificationChannel for FlakyChannel {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn deliver(&self, _request: &NotificationRequest) -> Result<String, NotifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                Err(NotifyError::Publish("gateway timeout".into()))
            } else {
                Ok(call.to_string())
            }
        }
    }

    /// Blocks each delivery until released
    struct GatedChannel {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl NotificationChannel for GatedChannel {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn deliver(&self, _request: &NotificationRequest) -> Result<String, NotifyError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok("ok".into())
        }
    }

    /// Never finishes a delivery, like a publish stuck behind a dead broker
    struct StalledChannel;

    impl NotificationChannel for StalledChannel {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn deliver(&self, _request: &NotificationRequest) -> Result<String, NotifyError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let channel = RecordingChannel::default();
        let sent = channel.sent.clone();
        let dispatcher = NotificationDispatcher::spawn(channel, &DispatchConfig::with_capacity(8));

        let accepted = dispatcher.submit_all(vec![request("a"), request("b"), request("c")]);
        assert_eq!(accepted, 3);

        let stats = dispatcher.shutdown().await;
        assert_eq!(stats, DeliveryStats { delivered: 3, failed: 0, dropped: 0, abandoned: 0 });
        assert_eq!(*sent.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel_once() {
        let channel = RecordingChannel::default();
        let closed = channel.closed.clone();
        let dispatcher = NotificationDispatcher::spawn(channel, &DispatchConfig::with_capacity(4));
        assert!(dispatcher.submit(request("a")));

        dispatcher.shutdown().await;
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_delivery_times_out() {
        let config = DispatchConfig {
            queue_capacity: 4,
            delivery_timeout_ms: 1_000,
            drain_timeout_ms: 60_000,
        };
        let dispatcher = NotificationDispatcher::spawn(StalledChannel, &config);
        assert_eq!(dispatcher.submit_all(vec![request("a"), request("b")]), 2);

        let stats = dispatcher.shutdown().await;
        assert_eq!(stats, DeliveryStats { delivered: 0, failed: 2, dropped: 0, abandoned: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_when_drain_times_out() {
        let config = DispatchConfig {
            queue_capacity: 4,
            delivery_timeout_ms: 3_600_000,
            drain_timeout_ms: 1_000,
        };
        let dispatcher = NotificationDispatcher::spawn(StalledChannel, &config);
        assert_eq!(dispatcher.submit_all(vec![request("a"), request("b"), request("c")]), 3);

        let stats = dispatcher.shutdown().await;
        assert_eq!(stats, DeliveryStats { delivered: 0, failed: 0, dropped: 0, abandoned: 3 });
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_retried() {
        let dispatcher =
            NotificationDispatcher::spawn(FlakyChannel::default(), &DispatchConfig::with_capacity(8));
        for i in 0..4 {
            assert!(dispatcher.submit(request(&i.to_string())));
        }

        let stats = dispatcher.shutdown().await;
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.failed, 2);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let dispatcher = NotificationDispatcher::spawn(
            GatedChannel {
                started: started.clone(),
                release: release.clone(),
            },
            &DispatchConfig::with_capacity(1),
        );

        assert!(dispatcher.submit(request("first")));
        started.notified().await;

        // Worker is busy with "first": one slot left in the queue
        assert!(dispatcher.submit(request("second")));
        assert!(!dispatcher.submit(request("third")));

        release.notify_one();
        // Second delivery waits on the gate again
        started.notified().await;
        release.notify_one();

        let stats = dispatcher.shutdown().await;
        assert_eq!(stats, DeliveryStats { delivered: 2, failed: 0, dropped: 1, abandoned: 0 });
    }
}
