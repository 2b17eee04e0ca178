// --- File: crates/geotrack_tracking/src/events.rs ---
//! In-process event bus for location and device-health updates.
//!
//! Every subscriber gets its own unbounded channel, so a slow consumer never
//! blocks a job and never drops events while it is still subscribed. Nothing
//! is persisted and late subscribers see no history.

use geotrack_common::models::{LatestLocation, TrackingDevice};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::trace;

pub const TENANT_LOCATION_TOPIC: &str = "partnerTrackingLocationUpdated";
pub const BOOKING_LOCATION_TOPIC: &str = "bookingTrackingLocationUpdated";
pub const TENANT_HEALTH_TOPIC: &str = "trackingDeviceHealthUpdated";

pub fn tenant_location_topic(tenant_id: &str) -> String {
    format!("{}:{}", TENANT_LOCATION_TOPIC, tenant_id)
}

pub fn booking_topic(booking_id: &str) -> String {
    format!("{}:{}", BOOKING_LOCATION_TOPIC, booking_id)
}

pub fn tenant_health_topic(tenant_id: &str) -> String {
    format!("{}:{}", TENANT_HEALTH_TOPIC, tenant_id)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    LocationUpdated(LatestLocation),
    DeviceHealthUpdated(TrackingDevice),
}

/// Publishing side of the bus, as seen by the jobs.
pub trait EventPublisher: Send + Sync {
    /// Delivers `event` to every live subscriber of `topic` and returns how
    /// many received it. Publishing to a topic nobody listens to is not an error.
    fn publish(&self, topic: &str, event: TrackingEvent) -> usize;
}

/// Topic-keyed fan-out over unbounded mpsc channels.
#[derive(Debug, Default)]
pub struct InProcessPubSub {
    topics: RwLock<HashMap<String, Vec<UnboundedSender<TrackingEvent>>>>,
}

impl InProcessPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        topics.entry(topic.to_string()).or_default().push(tx);
        Subscription {
            topic: topic.to_string(),
            receiver: rx,
        }
    }

    /// Live subscribers on `topic`. Dropped subscriptions are only pruned on
    /// the next publish, so this may over-count until then.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
        topics
            .get(topic)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl EventPublisher for InProcessPubSub {
    fn publish(&self, topic: &str, event: TrackingEvent) -> usize {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let Some(senders) = topics.get_mut(topic) else {
            trace!(topic, "No subscribers");
            return 0;
        };

        senders.retain(|tx| tx.send(event.clone()).is_ok());
        let delivered = senders.len();
        if senders.is_empty() {
            topics.remove(topic);
        }
        trace!(topic, delivered, "Event published");
        delivered
    }
}

/// A live stream of events for one topic. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: UnboundedReceiver<TrackingEvent>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next event. Returns `None` once the bus itself is gone.
    pub async fn recv(&mut self) -> Option<TrackingEvent> {
        self.receiver.recv().await
    }

    /// Next already-delivered event, if any.
    pub fn try_recv(&mut self) -> Option<TrackingEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drains everything delivered so far.
    pub fn drain(&mut self) -> Vec<TrackingEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
