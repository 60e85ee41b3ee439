//! Visitor-tracking sinks

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::events::ExperimentEvent;
use crate::ports::outbound::{RepoResult, RepositoryError, TrackingSink};

/// Append-only in-memory event log
#[derive(Default)]
pub struct InMemoryTrackingSink {
    events: Mutex<Vec<ExperimentEvent>>,
}

impl InMemoryTrackingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<ExperimentEvent> {
        self.events.lock().clone()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

#[async_trait]
impl TrackingSink for InMemoryTrackingSink {
    async fn record(&self, events: Vec<ExperimentEvent>) -> RepoResult<()> {
        self.events.lock().extend(events);
        Ok(())
    }
}

/// Writes each event as a structured log line under the `tracking` target
#[derive(Default)]
pub struct TracingTrackingSink;

#[async_trait]
impl TrackingSink for TracingTrackingSink {
    async fn record(&self, events: Vec<ExperimentEvent>) -> RepoResult<()> {
        for event in events {
            let payload = serde_json::to_string(&event)
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
            tracing::info!(
                target: "tracking",
                event_type = event.event_type(),
                campaign_id = %event.campaign_id(),
                %payload
            );
        }
        Ok(())
    }
}

/// No-op sink
#[derive(Default)]
pub struct NoOpTrackingSink;

#[async_trait]
impl TrackingSink for NoOpTrackingSink {
    async fn record(&self, _events: Vec<ExperimentEvent>) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{AssignmentMethod, EntityId, VisitorId};
    use chrono::Utc;

    fn assigned() -> ExperimentEvent {
        ExperimentEvent::VisitorAssigned {
            campaign_id: EntityId::from_string("c"),
            variant_id: EntityId::from_string("v"),
            visitor_id: VisitorId::new("visitor").unwrap(),
            method: AssignmentMethod::Hash,
            bucket: None,
            assigned_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_sink_appends() {
        let sink = InMemoryTrackingSink::new();
        sink.record(vec![assigned()]).await.unwrap();
        sink.record(vec![assigned(), assigned()]).await.unwrap();

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.count_of("experiment.visitor_assigned"), 3);
        assert_eq!(sink.count_of("experiment.conversion_recorded"), 0);
    }

    #[tokio::test]
    async fn test_tracing_sink_serializes_events() {
        let sink = TracingTrackingSink;
        assert!(sink.record(vec![assigned()]).await.is_ok());
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(assigned()).unwrap();
        assert_eq!(json["type"], "visitor_assigned");
        assert_eq!(json["visitor_id"], "visitor");
        assert_eq!(json["method"], "hash");
    }
}
