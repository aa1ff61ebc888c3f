//! Bounded event queue connecting the RPC server to the strategy loop
//!
//! Unlike the teacher's multi-subscriber pub-sub bus, this queue has
//! exactly one producer (the RPC server task handling `add_event`
//! callbacks from agents) and one consumer (the strategy task driving
//! an experiment). A bounded `tokio::sync::mpsc` channel is enough: the
//! strategy polls it on an interval rather than subscribing to a
//! broadcast.

use crate::events::Event;
use tokio::sync::mpsc;

/// Default channel capacity if the caller doesn't specify one
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Producer half, cloned into the RPC server's `add_event` handler
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    /// Enqueue an event, awaiting backpressure if the queue is full
    pub async fn send(&self, event: Event) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("event queue closed, dropping event");
                false
            }
        }
    }

    /// Enqueue an event without blocking, dropping it if the queue is full
    pub fn try_send(&self, event: Event) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

/// Consumer half, owned by the strategy task
pub struct EventReceiver {
    rx: mpsc::Receiver<Event>,
}

impl EventReceiver {
    /// Drain every event currently buffered without waiting for more
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next event, or `None` once the sender has been dropped
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Create a connected sender/receiver pair
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, EventReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Alert;

    fn sample_scanner_event() -> Event {
        Event::Scanner {
            scanner: "10.0.0.1".parse().unwrap(),
            target: "10.0.0.2".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_send_and_recv() {
        let (tx, mut rx) = event_queue(DEFAULT_QUEUE_CAPACITY);
        assert!(tx.send(sample_scanner_event()).await);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, sample_scanner_event());
    }

    #[tokio::test]
    async fn test_drain_collects_all_buffered_events() {
        let (tx, mut rx) = event_queue(DEFAULT_QUEUE_CAPACITY);
        for _ in 0..5 {
            tx.send(sample_scanner_event()).await;
        }

        let drained = rx.drain();
        assert_eq!(drained.len(), 5);
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (tx, rx) = event_queue(4);
        drop(rx);
        assert!(!tx.send(sample_scanner_event()).await);
    }

    #[test]
    fn test_try_send_respects_capacity() {
        let (tx, _rx) = event_queue(1);
        assert!(tx.try_send(sample_scanner_event()));
        assert!(!tx.try_send(sample_scanner_event()));
    }

    #[tokio::test]
    async fn test_firewall_event_round_trip() {
        let (tx, mut rx) = event_queue(DEFAULT_QUEUE_CAPACITY);
        let event = Event::Firewall {
            alert: Alert {
                patterns: vec!["SCAN".to_string()],
                detected_by: "10.0.0.9".parse().unwrap(),
                ip_src: "10.0.0.1".parse().unwrap(),
                ip_dst: "10.0.0.2".parse().unwrap(),
                date: 1_700_000_000,
            },
        };
        tx.send(event.clone()).await;
        assert_eq!(rx.recv().await.unwrap(), event);
    }
}
