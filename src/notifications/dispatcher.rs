use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use super::gateway::{Notification, NotificationError, NotificationGateway};

/// Delivers notifications collected during a critical section.
///
/// [`enqueue`](Self::enqueue) hands a batch to a background worker and returns
/// at once, so a slow gateway never holds up the request that produced the
/// batch. The worker is started on first use and delivers batches in the order
/// they were queued. Each gateway call is bounded by `timeout`; failures are
/// logged and swallowed because the waitlist entry status, not delivery, is
/// the source of truth.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    delivery: Delivery,
    queue: Arc<OnceLock<mpsc::UnboundedSender<Vec<Notification>>>>,
    in_flight: Arc<InFlight>,
}

#[derive(Debug, Clone)]
struct Delivery {
    gateway: Arc<dyn NotificationGateway>,
    timeout: Duration,
}

/// Batches queued but not yet fully delivered
#[derive(Debug, Default)]
struct InFlight {
    batches: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn finish(&self) {
        if self.batches.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn NotificationGateway>, timeout: Duration) -> Self {
        Self {
            delivery: Delivery { gateway, timeout },
            queue: Arc::new(OnceLock::new()),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Queue a batch for background delivery. Must be called from within a
    /// tokio runtime.
    pub fn enqueue(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }

        self.in_flight.batches.fetch_add(1, Ordering::AcqRel);
        let sender = self.queue.get_or_init(|| self.start_worker());
        if let Err(mpsc::error::SendError(batch)) = sender.send(notifications) {
            self.in_flight.finish();
            warn!(
                count = batch.len(),
                "Notification worker stopped; batch dropped"
            );
        }
    }

    /// Deliver a batch in the caller's task; returns how many were delivered
    pub async fn dispatch(&self, notifications: Vec<Notification>) -> usize {
        self.delivery.deliver_batch(notifications).await
    }

    /// Batches queued with [`enqueue`](Self::enqueue) that are still being delivered
    pub fn pending_batches(&self) -> usize {
        self.in_flight.batches.load(Ordering::Acquire)
    }

    /// Wait until every queued batch has been delivered or has failed
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.pending_batches() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn start_worker(&self) -> mpsc::UnboundedSender<Vec<Notification>> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Vec<Notification>>();
        // The worker holds no sender, so it stops once every dispatcher clone is dropped
        let delivery = self.delivery.clone();
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            while let Some(batch) = receiver.recv().await {
                delivery.deliver_batch(batch).await;
                in_flight.finish();
            }
            debug!("Notification worker stopped");
        });

        sender
    }
}

impl Delivery {
    async fn deliver_batch(&self, notifications: Vec<Notification>) -> usize {
        let mut delivered = 0;
        for notification in notifications {
            match self.deliver(&notification).await {
                Ok(()) => {
                    delivered += 1;
                    debug!(
                        volunteer_id = %notification.volunteer_id,
                        event_id = %notification.event_id,
                        kind = %notification.kind,
                        "Notification delivered"
                    );
                }
                Err(e) => {
                    warn!(
                        volunteer_id = %notification.volunteer_id,
                        event_id = %notification.event_id,
                        kind = %notification.kind,
                        error = %e,
                        "Notification delivery failed; state change stands"
                    );
                }
            }
        }
        delivered
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        let call = self.gateway.notify(
            notification.volunteer_id,
            notification.event_id,
            &notification.kind,
        );
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventId, VolunteerId};
    use crate::notifications::NotificationKind;
    use crate::test_helpers::{FailingNotificationGateway, RecordingNotificationGateway};
    use std::time::Instant;

    fn offer() -> Notification {
        Notification::new(
            VolunteerId::new(),
            EventId::new(),
            NotificationKind::OfferExpired,
        )
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_order() {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let dispatcher = NotificationDispatcher::new(gateway.clone(), Duration::from_secs(1));
        let first = offer();
        let second = offer();

        let delivered = dispatcher
            .dispatch(vec![first.clone(), second.clone()])
            .await;
        assert_eq!(delivered, 2);
        assert_eq!(gateway.sent(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(FailingNotificationGateway),
            Duration::from_secs(1),
        );
        assert_eq!(dispatcher.dispatch(vec![offer(), offer()]).await, 0);

        dispatcher.enqueue(vec![offer()]);
        dispatcher.wait_idle().await;
        assert_eq!(dispatcher.pending_batches(), 0);
    }

    #[tokio::test]
    async fn test_slow_gateway_times_out() {
        let gateway = Arc::new(RecordingNotificationGateway::with_delay(Duration::from_secs(10)));
        let dispatcher = NotificationDispatcher::new(gateway, Duration::from_millis(50));
        assert_eq!(dispatcher.dispatch(vec![offer()]).await, 0);
    }

    #[tokio::test]
    async fn test_enqueue_returns_before_delivery() {
        let gateway = Arc::new(RecordingNotificationGateway::with_delay(Duration::from_millis(200)));
        let dispatcher = NotificationDispatcher::new(gateway.clone(), Duration::from_secs(1));

        let started = Instant::now();
        dispatcher.enqueue(vec![offer(), offer()]);
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(dispatcher.pending_batches(), 1);

        dispatcher.wait_idle().await;
        assert_eq!(gateway.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_batches_arrive_in_queue_order() {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let dispatcher = NotificationDispatcher::new(gateway.clone(), Duration::from_secs(1));
        let batches: Vec<Notification> = (0..5).map(|_| offer()).collect();

        for notification in &batches {
            dispatcher.enqueue(vec![notification.clone()]);
        }
        dispatcher.wait_idle().await;

        assert_eq!(gateway.sent(), batches);
    }

    #[tokio::test]
    async fn test_wait_idle_without_work_returns() {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(RecordingNotificationGateway::new()),
            Duration::from_secs(1),
        );
        dispatcher.enqueue(Vec::new());
        dispatcher.wait_idle().await;
        assert_eq!(dispatcher.pending_batches(), 0);
    }
}
