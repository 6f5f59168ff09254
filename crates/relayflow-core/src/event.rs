/*!
 * Boot event broadcasting for RelayFlow.
 *
 * Both boot stages report what they create (and what they give up on) as
 * [`BootEvent`]s. Anything that wants to observe the boot, such as a status
 * LED driver, a diagnostics endpoint or a test, subscribes to the bus.
 */
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::error::{Error, Result};

/// Maximum number of events that can be buffered for a slow subscriber
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Boot stage that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Peripheral bring-up
    BringUp,
    /// Accessory topology construction
    Topology,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BootEventKind {
    /// An output channel was constructed and initialized
    OutputReady {
        /// Channel id
        id: u8,
    },
    /// An input channel was constructed and initialized
    InputReady {
        /// Channel id
        id: u8,
    },
    /// A power meter was constructed and initialized
    PowerMeterReady {
        /// Channel id
        id: u8,
    },
    /// Metering could not be brought up; no power meters this boot
    MeteringUnavailable {
        /// Failure description
        reason: String,
    },
    /// The system temperature sensor was created
    TempSensorReady,
    /// A component was added to the component collection
    ComponentRegistered {
        /// Component kind name
        kind: &'static str,
        /// Component id
        id: u8,
    },
    /// A bridged accessory was added to the accessory collection
    AccessoryAdded {
        /// Accessory id
        aid: u64,
    },
    /// A topology branch gave up without registering anything
    BranchAborted {
        /// Device mode name
        mode: &'static str,
        /// Failure description
        reason: String,
    },
    /// Topology construction finished
    TopologyComplete {
        /// Device mode name
        mode: &'static str,
        /// Number of components
        components: usize,
        /// Number of accessories, primary included
        accessories: usize,
    },
}

/// A timestamped boot event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootEvent {
    /// Producing stage
    pub stage: Stage,
    /// Event payload
    pub kind: BootEventKind,
    /// Wall-clock time of the event
    pub timestamp: DateTime<Utc>,
}

impl BootEvent {
    /// Create a new event stamped with the current time
    pub fn new(stage: Stage, kind: BootEventKind) -> Self {
        Self {
            stage,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Event bus for boot events
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<BootEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with a specific channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event, returning the number of subscribers that received it
    ///
    /// Publishing while nobody listens is not an error.
    pub fn publish(&self, event: BootEvent) -> Result<usize> {
        if self.sender.receiver_count() == 0 {
            trace!(?event.kind, "No subscribers for boot event");
            return Ok(0);
        }

        self.sender.send(event).map_err(|e| {
            warn!("Failed to publish boot event: {}", e);
            Error::event(format!("Failed to publish boot event: {}", e))
        })
    }

    /// Publish an event from `stage`
    pub fn emit(&self, stage: Stage, kind: BootEventKind) -> Result<usize> {
        self.publish(BootEvent::new(stage, kind))
    }

    /// Subscribe to boot events
    pub fn subscribe(&self) -> broadcast::Receiver<BootEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A shared event bus that can be cloned
#[derive(Debug, Clone, Default)]
pub struct SharedEventBus(Arc<EventBus>);

impl SharedEventBus {
    /// Create a new shared event bus
    pub fn new() -> Self {
        Self(Arc::new(EventBus::new()))
    }

    /// Create a new shared event bus with a specific channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Arc::new(EventBus::with_capacity(capacity)))
    }

    /// Publish an event from `stage`
    pub fn emit(&self, stage: Stage, kind: BootEventKind) -> Result<usize> {
        self.0.emit(stage, kind)
    }

    /// Subscribe to boot events
    pub fn subscribe(&self) -> broadcast::Receiver<BootEvent> {
        self.0.subscribe()
    }
}

/// Publish on an optional bus, logging instead of failing.
///
/// Boot must never stop because an observer fell behind.
pub fn emit_to(bus: Option<&SharedEventBus>, stage: Stage, kind: BootEventKind) {
    if let Some(bus) = bus {
        if let Err(e) = bus.emit(stage, kind) {
            warn!("Dropping boot event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        let n = bus.emit(Stage::BringUp, BootEventKind::TempSensorReady).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let bus = SharedEventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(Stage::BringUp, BootEventKind::OutputReady { id: 1 }).unwrap();
        bus.emit(Stage::BringUp, BootEventKind::OutputReady { id: 2 }).unwrap();

        assert_eq!(rx.try_recv().unwrap().kind, BootEventKind::OutputReady { id: 1 });
        assert_eq!(rx.try_recv().unwrap().kind, BootEventKind::OutputReady { id: 2 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_async_receive() {
        let bus = SharedEventBus::with_capacity(4);
        let mut rx = bus.subscribe();
        let publisher = bus.clone();

        tokio::spawn(async move {
            emit_to(
                Some(&publisher),
                Stage::Topology,
                BootEventKind::AccessoryAdded { aid: 0x501 },
            );
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.stage, Stage::Topology);
        assert_eq!(event.kind, BootEventKind::AccessoryAdded { aid: 0x501 });
    }

    #[test]
    fn test_emit_to_none_is_noop() {
        emit_to(None, Stage::BringUp, BootEventKind::TempSensorReady);
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = BootEvent::new(
            Stage::Topology,
            BootEventKind::BranchAborted {
                mode: "roller-shutter",
                reason: "init failed".to_string(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "topology");
        assert_eq!(json["kind"]["type"], "branch_aborted");
        assert_eq!(json["kind"]["mode"], "roller-shutter");
    }
}
